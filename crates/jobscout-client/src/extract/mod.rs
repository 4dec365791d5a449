//! The five extraction methods and the suite that runs them.
//!
//! Each method reads a [`DomQuery`] and returns an [`ExtractionRecord`];
//! a method that fails logs a warning and contributes an empty record.

pub mod heuristics;
pub mod jsonld;
pub mod microdata;
pub mod patterns;
pub mod profiles;

use jobscout_core::error::AppError;
use jobscout_core::models::{Field, MethodKind};
use jobscout_core::record::ExtractionRecord;
use jobscout_core::traits::RecordExtractor;
use jobscout_core::util::host_of;
use url::Url;

use crate::cleaner::TextCleaner;
use crate::dom::{DomNode, DomQuery, HtmlDocument};

/// Most items kept per list field by a single method.
pub(crate) const MAX_LIST_ITEMS: usize = 15;

/// What every method knows about the page besides its DOM.
pub struct PageContext<'a> {
    pub url: &'a str,
    pub base: Option<Url>,
    pub host: String,
    pub cleaner: &'a TextCleaner,
}

impl<'a> PageContext<'a> {
    pub fn new(url: &'a str, cleaner: &'a TextCleaner) -> Self {
        Self {
            url,
            base: Url::parse(url).ok(),
            host: host_of(url).unwrap_or_default(),
            cleaner,
        }
    }

    /// Description text from a node: HTML through the cleaner, falling back
    /// to the node's block text.
    pub fn description_of<N: DomNode>(&self, node: &N) -> String {
        match self.cleaner.to_text(&node.inner_html(), self.base.as_ref()) {
            Ok(text) if !text.trim().is_empty() => text,
            _ => node.block_text(),
        }
    }

    /// Description text from an HTML string (JSON-LD, microdata content).
    pub fn description_from_html(&self, html: &str) -> String {
        if !html.contains('<') {
            return html.to_string();
        }
        self.cleaner
            .to_text(html, self.base.as_ref())
            .unwrap_or_else(|_| html.to_string())
    }
}

/// Runs all five methods over one page.
#[derive(Clone, Default)]
pub struct ExtractorSuite {
    cleaner: TextCleaner,
}

impl ExtractorSuite {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordExtractor for ExtractorSuite {
    fn extract_all(&self, html: &str, url: &str) -> Vec<ExtractionRecord> {
        let doc = HtmlDocument::parse(html);
        let ctx = PageContext::new(url, &self.cleaner);

        let outcomes: [(MethodKind, Result<ExtractionRecord, AppError>); 5] = [
            (MethodKind::JsonLd, jsonld::extract(&doc, &ctx)),
            (MethodKind::SiteProfile, profiles::extract(&doc, &ctx)),
            (MethodKind::Microdata, microdata::extract(&doc, &ctx)),
            (MethodKind::Dom, heuristics::extract(&doc, &ctx)),
            (MethodKind::Regex, patterns::extract(&doc, &ctx)),
        ];

        outcomes
            .into_iter()
            .map(|(method, outcome)| match outcome {
                Ok(record) => {
                    tracing::debug!(%method, fields = record.len(), url, "Method finished");
                    record
                }
                Err(e) => {
                    tracing::warn!(%method, url, error = %e, "Extraction method failed");
                    ExtractionRecord::empty(method)
                }
            })
            .collect()
    }
}

/// Map a section heading ("What you'll do", "Requirements", ...) to the
/// list field it introduces.
pub fn classify_heading(heading: &str) -> Option<Field> {
    const BENEFITS: &[&str] = &[
        "benefit", "perks", "what we offer", "we offer", "why join", "why work", "compensation",
    ];
    const QUALIFICATIONS: &[&str] = &[
        "qualification",
        "requirement",
        "what you'll need",
        "what you will need",
        "what you bring",
        "what we're looking for",
        "what we are looking for",
        "about you",
        "you have",
        "you might be",
        "must have",
        "nice to have",
        "skills",
        "experience",
        "who you are",
    ];
    const RESPONSIBILITIES: &[&str] = &[
        "responsibilit",
        "what you'll do",
        "what you will do",
        "what you'll be doing",
        "your role",
        "the role",
        "duties",
        "day to day",
        "day-to-day",
        "your impact",
        "in this role",
    ];

    let lower = heading.to_lowercase().replace('\u{2019}', "'");
    if lower.chars().count() > 80 {
        return None;
    }
    if BENEFITS.iter().any(|k| lower.contains(k)) {
        Some(Field::Benefits)
    } else if RESPONSIBILITIES.iter().any(|k| lower.contains(k)) {
        Some(Field::Responsibilities)
    } else if QUALIFICATIONS.iter().any(|k| lower.contains(k)) {
        Some(Field::Qualifications)
    } else {
        None
    }
}

/// `<li>` texts of a list node, skipping fragments and walls of text.
pub(crate) fn list_items<N: DomNode>(list: &N) -> Vec<String> {
    list.select_all("li")
        .iter()
        .map(DomNode::text)
        .filter(|t| (3..=300).contains(&t.chars().count()))
        .take(MAX_LIST_ITEMS)
        .collect()
}

/// Infer an employment type from free text ("full-time", "contract", ...).
pub(crate) fn employment_from_text(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    if lower.contains("full-time") || lower.contains("full time") {
        Some("full-time")
    } else if lower.contains("part-time") || lower.contains("part time") {
        Some("part-time")
    } else if lower.contains("contractor") || lower.contains("contract role") || lower.contains("contract position") {
        Some("contract")
    } else if lower.contains("internship") {
        Some("internship")
    } else {
        None
    }
}
