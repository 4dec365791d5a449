//! Platform-independent DOM fallbacks.

use jobscout_core::error::AppError;
use jobscout_core::models::{EmploymentType, Field, MethodKind};
use jobscout_core::record::ExtractionRecord;

use super::{PageContext, classify_heading, employment_from_text, list_items};
use crate::dom::{DomNode, DomQuery};

const TITLE_SELECTORS: &[&str] = &[
    "h1.job-title",
    "h1[class*='title']",
    "h1[class*='job']",
    "[class*='job-title']",
    "[class*='jobTitle']",
    "[class*='posting-title']",
    "h1",
];
const COMPANY_SELECTORS: &[&str] = &[
    "[class*='company-name']",
    "[class*='companyName']",
    "[class*='company']",
    "[class*='employer']",
    "[itemprop='hiringOrganization']",
    "meta[property='og:site_name']",
];
const LOCATION_SELECTORS: &[&str] = &[
    "[class*='job-location']",
    "[class*='jobLocation']",
    "[class*='location']",
    "[data-testid*='location']",
];
const EMPLOYMENT_SELECTORS: &[&str] = &[
    "[class*='employment-type']",
    "[class*='employmentType']",
    "[class*='job-type']",
];
const DESCRIPTION_SELECTORS: &[&str] = &[
    "[class*='job-description']",
    "[class*='jobDescription']",
    "[class*='job-desc']",
    "[class*='description']",
    "[id*='description']",
    "main",
    "article",
    "[role='main']",
];

/// Shorter descriptions are considered noise.
const MIN_DESCRIPTION_CHARS: usize = 50;

pub fn extract<D: DomQuery>(doc: &D, ctx: &PageContext<'_>) -> Result<ExtractionRecord, AppError> {
    let mut record = ExtractionRecord::new(MethodKind::Dom);

    if let Some(title) = short_text(doc, TITLE_SELECTORS, 200).or_else(|| title_from_head(doc)) {
        record.set_text(Field::Title, title);
    }
    // Never the <title>: it usually names the job board, not the employer.
    if let Some(company) = short_text(doc, COMPANY_SELECTORS, 100) {
        record.set_text(Field::Company, company);
    }
    if let Some(location) = short_text(doc, LOCATION_SELECTORS, 150) {
        record.set_text(Field::Location, location);
    }
    if let Some(date) = doc
        .select_one("time[datetime]")
        .and_then(|t| t.attr("datetime").map(str::to_string))
    {
        record.set_text(Field::DatePosted, date);
    }

    let description = description(doc, ctx);
    let employment = short_text(doc, EMPLOYMENT_SELECTORS, 60)
        .and_then(|raw| EmploymentType::parse(&raw))
        .map(|ty| ty.as_str())
        .or_else(|| description.as_deref().and_then(employment_from_text));
    if let Some(employment) = employment {
        record.set_text(Field::EmploymentType, employment);
    }
    if let Some(description) = description {
        record.set_block(Field::Description, description);
    }

    collect_lists(doc, &mut record);
    Ok(record)
}

fn short_text<D: DomQuery>(doc: &D, selectors: &[&str], max_chars: usize) -> Option<String> {
    selectors.iter().find_map(|sel| {
        doc.select_all(sel)
            .iter()
            .map(DomNode::value_text)
            .find(|text| (3..=max_chars).contains(&text.chars().count()))
    })
}

/// First segment of `<title>`, split on the usual separators.
fn title_from_head<D: DomQuery>(doc: &D) -> Option<String> {
    let full = doc.select_one("title")?.text();
    let first = [" | ", " - ", " – ", " — ", " :: "]
        .iter()
        .fold(full.as_str(), |acc, sep| acc.split(sep).next().unwrap_or(acc))
        .trim();
    (first.chars().count() > 2).then(|| first.to_string())
}

fn description<D: DomQuery>(doc: &D, ctx: &PageContext<'_>) -> Option<String> {
    let long_enough = |text: &String| text.chars().count() > MIN_DESCRIPTION_CHARS;
    DESCRIPTION_SELECTORS
        .iter()
        .find_map(|sel| {
            doc.select_all(sel)
                .iter()
                .filter(|node| node.tag_name() != "meta")
                .map(|node| ctx.description_of(node))
                .find(long_enough)
        })
        .or_else(|| {
            let body = doc.select_one("body")?;
            Some(ctx.description_of(&body)).filter(long_enough)
        })
}

/// Lists classified by the heading or paragraph that introduces them.
fn collect_lists<D: DomQuery>(doc: &D, record: &mut ExtractionRecord) {
    for list in doc.select_all("ul, ol") {
        if list.parent_element().is_some_and(|p| p.tag_name() == "li") {
            continue;
        }
        let Some(field) = list_context(&list).and_then(|ctx| classify_heading(&ctx)) else {
            continue;
        };
        record.extend_list(field, list_items(&list));
    }
}

/// Text right before a list: its previous sibling, or its parent's.
fn list_context<N: DomNode>(list: &N) -> Option<String> {
    list.previous_element()
        .or_else(|| list.parent_element().and_then(|p| p.previous_element()))
        .map(|node| node.text())
        .filter(|text| !text.is_empty())
}
