//! Post-merge cleanup and repair.
//!
//! Turns a [`MergedRecord`] into a [`JobPosting`]: cleans text, maps
//! employment types and dates onto canonical values, structures locations,
//! and fills required fields with deterministic fallbacks. Every repair
//! leaves a warning in the provenance.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;

use crate::merge::MergedRecord;
use crate::models::{
    EmploymentType, Field, FieldSource, JobLocation, JobPosting, Place, Provenance, SalaryRange,
};
use crate::record::FieldValue;
use crate::schema::validate_posting;
use crate::util::{collapse_whitespace, host_of, title_case};

/// Fallbacks and thresholds used by [`Normalizer`].
#[derive(Debug, Clone)]
pub struct NormalizerConfig {
    pub min_description_chars: usize,
    /// A description's first line becomes the title only if shorter than this.
    pub max_derived_title_chars: usize,
    /// Bullet items per section in a synthesized description.
    pub max_bullets: usize,
    pub fallback_title: String,
    pub fallback_company: String,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            min_description_chars: 50,
            max_derived_title_chars: 100,
            max_bullets: 10,
            fallback_title: "Job Opening".into(),
            fallback_company: "Unknown Company".into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    config: NormalizerConfig,
}

static TITLE_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(job\s+title|job|position|role)\s*:\s*").expect("title prefix regex")
});
static LOCATION_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(job\s+)?location\s*:\s*").expect("location prefix regex")
});
static PARENTHETICAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)").expect("parenthetical regex"));
static REMOTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(remote|anywhere|work from home|wfh|telecommute|distributed)\b")
        .expect("remote regex")
});
static REGION_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{2}$").expect("region code regex"));

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d-%m-%Y", "%B %d, %Y", "%b %d, %Y", "%d %B %Y"];

impl Normalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    /// Build the final posting. Never fails; problems become warnings.
    pub fn normalize(
        &self,
        merged: &MergedRecord,
        source_url: &str,
        retrieved_at: DateTime<Utc>,
    ) -> JobPosting {
        let mut warnings = Vec::new();
        let mut sources: BTreeMap<Field, FieldSource> = BTreeMap::new();
        let source_of = |field: Field| merged.sources.get(&field).map(|m| FieldSource::Method(*m));

        let responsibilities = clean_list(merged.list(Field::Responsibilities));
        let qualifications = clean_list(merged.list(Field::Qualifications));
        let skills = clean_list(merged.list(Field::Skills));
        let benefits = clean_list(merged.list(Field::Benefits));
        for (field, list) in [
            (Field::Responsibilities, &responsibilities),
            (Field::Qualifications, &qualifications),
            (Field::Skills, &skills),
            (Field::Benefits, &benefits),
        ] {
            if !list.is_empty()
                && let Some(source) = source_of(field)
            {
                sources.insert(field, source);
            }
        }

        let raw_description = merged
            .text(Field::Description)
            .map(clean_description)
            .unwrap_or_default();

        let title = match merged.text(Field::Title).map(clean_title).filter(|t| !t.is_empty()) {
            Some(title) => {
                if let Some(source) = source_of(Field::Title) {
                    sources.insert(Field::Title, source);
                }
                title
            }
            None => {
                sources.insert(Field::Title, FieldSource::Repair);
                self.repair_title(&raw_description, &mut warnings)
            }
        };

        let company = match merged
            .text(Field::Company)
            .map(collapse_whitespace)
            .filter(|c| !c.is_empty())
        {
            Some(company) => {
                if let Some(source) = source_of(Field::Company) {
                    sources.insert(Field::Company, source);
                }
                company
            }
            None => {
                sources.insert(Field::Company, FieldSource::Repair);
                self.repair_company(source_url, &mut warnings)
            }
        };

        let description = if raw_description.chars().count() >= self.config.min_description_chars {
            if let Some(source) = source_of(Field::Description) {
                sources.insert(Field::Description, source);
            }
            raw_description
        } else {
            sources.insert(Field::Description, FieldSource::Repair);
            self.repair_description(&title, &company, &responsibilities, &qualifications, &mut warnings)
        };

        let location = merged
            .text(Field::Location)
            .map(|raw| LOCATION_PREFIX_RE.replace(raw, "").trim().to_string())
            .filter(|raw| !raw.is_empty())
            .map(|raw| parse_location(&raw));
        if location.is_some()
            && let Some(source) = source_of(Field::Location)
        {
            sources.insert(Field::Location, source);
        }

        let employment_type = merged.text(Field::EmploymentType).and_then(|raw| {
            let parsed = EmploymentType::parse(raw);
            if parsed.is_none() {
                warnings.push(format!("employment type '{raw}' not recognized; dropped"));
            }
            parsed
        });
        if employment_type.is_some()
            && let Some(source) = source_of(Field::EmploymentType)
        {
            sources.insert(Field::EmploymentType, source);
        }

        let date_posted = merged.text(Field::DatePosted).and_then(|raw| {
            let parsed = normalize_date(raw);
            if parsed.is_none() {
                warnings.push(format!("date '{raw}' not recognized; dropped"));
            }
            parsed
        });
        if date_posted.is_some()
            && let Some(source) = source_of(Field::DatePosted)
        {
            sources.insert(Field::DatePosted, source);
        }

        let salary = match merged.values.get(&Field::Salary) {
            Some(FieldValue::Salary(s)) => normalize_salary(s),
            _ => None,
        };
        if salary.is_some()
            && let Some(source) = source_of(Field::Salary)
        {
            sources.insert(Field::Salary, source);
        }

        let extraction_method = merged
            .primary_method
            .map(FieldSource::Method)
            .unwrap_or(FieldSource::Repair);

        let mut posting = JobPosting {
            title,
            company,
            location,
            employment_type,
            date_posted,
            description,
            salary,
            responsibilities,
            qualifications,
            skills,
            benefits,
            source_url: source_url.to_string(),
            retrieved_at,
            provenance: Provenance {
                extraction_method,
                confidence_score: merged.confidence.clamp(0.0, 1.0),
                field_sources: sources,
                warnings,
            },
        };

        let violations = validate_posting(&posting);
        posting.provenance.warnings.extend(violations);
        posting
    }

    fn repair_title(&self, description: &str, warnings: &mut Vec<String>) -> String {
        let first_line = description
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(clean_title)
            .filter(|l| l.chars().count() < self.config.max_derived_title_chars);

        match first_line {
            Some(line) => {
                warnings.push("title missing; used first line of description".into());
                line
            }
            None => {
                warnings.push(format!(
                    "title missing; used fallback '{}'",
                    self.config.fallback_title
                ));
                self.config.fallback_title.clone()
            }
        }
    }

    fn repair_company(&self, source_url: &str, warnings: &mut Vec<String>) -> String {
        match host_of(source_url).and_then(|h| company_from_host(&h)) {
            Some(company) => {
                warnings.push(format!("company missing; derived '{company}' from hostname"));
                company
            }
            None => {
                warnings.push(format!(
                    "company missing; used fallback '{}'",
                    self.config.fallback_company
                ));
                self.config.fallback_company.clone()
            }
        }
    }

    fn repair_description(
        &self,
        title: &str,
        company: &str,
        responsibilities: &[String],
        qualifications: &[String],
        warnings: &mut Vec<String>,
    ) -> String {
        let mut sections = Vec::new();
        for (heading, items) in [
            ("Responsibilities", responsibilities),
            ("Qualifications", qualifications),
        ] {
            if items.is_empty() {
                continue;
            }
            let bullets: Vec<String> = items
                .iter()
                .take(self.config.max_bullets)
                .map(|i| format!("• {i}"))
                .collect();
            sections.push(format!("{heading}:\n{}", bullets.join("\n")));
        }

        if sections.is_empty() {
            warnings.push("description too short; used template".into());
            format!("Job opening at {company} for {title}")
        } else {
            warnings.push("description too short; synthesized from listed sections".into());
            sections.join("\n\n")
        }
    }
}

fn clean_title(raw: &str) -> String {
    collapse_whitespace(&TITLE_PREFIX_RE.replace(raw, ""))
}

fn clean_description(raw: &str) -> String {
    raw.lines()
        .map(|l| collapse_whitespace(l))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn clean_list(items: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        let cleaned = collapse_whitespace(item.trim_start_matches(['•', '-', '*', '·']));
        if cleaned.is_empty() || out.iter().any(|e| e.to_lowercase() == cleaned.to_lowercase()) {
            continue;
        }
        out.push(cleaned);
    }
    out
}

/// Derive a company name from a hostname.
///
/// `jobs.example.com` → `Example`; returns `None` when the remaining label
/// is too short to be a name.
pub fn company_from_host(host: &str) -> Option<String> {
    let mut host = host.trim_end_matches('.').to_ascii_lowercase();
    for prefix in ["www.", "jobs.", "careers."] {
        if let Some(rest) = host.strip_prefix(prefix) {
            host = rest.to_string();
        }
    }

    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    let label = match labels.len() {
        0 => return None,
        1 => labels[0],
        n => {
            let candidate = labels[n - 2];
            if n >= 3 && matches!(candidate, "co" | "com" | "org" | "net" | "ac" | "gov") {
                labels[n - 3]
            } else {
                candidate
            }
        }
    };

    if label.chars().count() <= 2 || label.parse::<u32>().is_ok() {
        return None;
    }
    Some(title_case(label))
}

/// Split a location string into a remote flag and a structured place.
///
/// `"Austin, TX"` → locality + region; `"Berlin, Germany"` → locality +
/// country; `"Remote"` → remote flag, no place.
pub fn parse_location(raw: &str) -> JobLocation {
    let raw = collapse_whitespace(raw);
    let remote = REMOTE_RE.is_match(&raw);

    let without_notes = PARENTHETICAL_RE.replace_all(&raw, " ");
    let segment = without_notes
        .split(['|', ';', '/'])
        .flat_map(|s| s.split(" - "))
        .map(|s| REMOTE_RE.replace_all(s, " ").to_string())
        .map(|s| collapse_whitespace(&s))
        .find(|s| s.contains(','))
        .unwrap_or_default();

    let parts: Vec<String> = segment
        .split(',')
        .map(|p| collapse_whitespace(p))
        .filter(|p| !p.is_empty())
        .collect();

    let place = match parts.as_slice() {
        [locality, second] => {
            if REGION_CODE_RE.is_match(second) {
                Some(Place {
                    locality: Some(locality.clone()),
                    region: Some(second.clone()),
                    country: None,
                })
            } else {
                Some(Place {
                    locality: Some(locality.clone()),
                    region: None,
                    country: Some(second.clone()),
                })
            }
        }
        [locality, region, .., country] => Some(Place {
            locality: Some(locality.clone()),
            region: Some(region.clone()),
            country: Some(country.clone()),
        }),
        _ => None,
    };

    JobLocation { raw, remote, place }
}

/// Normalize a posted date to `YYYY-MM-DD`.
pub fn normalize_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive().format("%Y-%m-%d").to_string());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.date().format("%Y-%m-%d").to_string());
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date.format("%Y-%m-%d").to_string());
        }
    }
    // Leading ISO date followed by anything else ("2025-01-15T09:00:00.000+0000").
    raw.get(..10)
        .and_then(|head| NaiveDate::parse_from_str(head, "%Y-%m-%d").ok())
        .map(|d| d.format("%Y-%m-%d").to_string())
}

fn normalize_salary(salary: &SalaryRange) -> Option<SalaryRange> {
    let valid = |v: Option<f64>| v.filter(|n| n.is_finite() && *n > 0.0);
    let (mut min, mut max) = (valid(salary.min), valid(salary.max));
    if let (Some(lo), Some(hi)) = (min, max)
        && lo > hi
    {
        (min, max) = (Some(hi), Some(lo));
    }
    if min.is_none() && max.is_none() {
        return None;
    }
    Some(SalaryRange {
        min,
        max,
        currency: salary
            .currency
            .as_ref()
            .map(|c| c.trim().to_ascii_uppercase())
            .filter(|c| c.len() == 3 && c.chars().all(|ch| ch.is_ascii_alphabetic())),
        period: salary.period,
    })
}
