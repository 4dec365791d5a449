//! schema.org `JobPosting` blocks in `<script type="application/ld+json">`.

use jobscout_core::error::AppError;
use jobscout_core::models::{EmploymentType, Field, MethodKind, SalaryPeriod, SalaryRange};
use jobscout_core::record::ExtractionRecord;
use serde_json::Value;

use super::{MAX_LIST_ITEMS, PageContext};
use crate::dom::{DomNode, DomQuery};

/// How deep to look for a `JobPosting` inside wrapper objects.
const MAX_DEPTH: usize = 6;

pub fn extract<D: DomQuery>(doc: &D, ctx: &PageContext<'_>) -> Result<ExtractionRecord, AppError> {
    let mut record = ExtractionRecord::new(MethodKind::JsonLd);
    let scripts = doc.select_all("script[type='application/ld+json']");
    if scripts.is_empty() {
        return Ok(record);
    }

    let mut parse_errors = Vec::new();
    let mut parsed_any = false;
    for script in &scripts {
        let raw = script.raw_text();
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => {
                parsed_any = true;
                if let Some(posting) = find_job_posting(&value, 0) {
                    fill(&mut record, posting, ctx);
                    return Ok(record);
                }
            }
            Err(e) => parse_errors.push(e.to_string()),
        }
    }

    if !parsed_any && !parse_errors.is_empty() {
        return Err(AppError::ExtractionError(format!(
            "invalid JSON-LD: {}",
            parse_errors.join("; ")
        )));
    }
    Ok(record)
}

/// Find the first object typed `JobPosting`: at the top level, in a list,
/// under `@graph`, or nested inside another object.
fn find_job_posting(value: &Value, depth: usize) -> Option<&Value> {
    if depth > MAX_DEPTH {
        return None;
    }
    match value {
        Value::Array(items) => items.iter().find_map(|v| find_job_posting(v, depth + 1)),
        Value::Object(map) => {
            if is_job_posting(value) {
                return Some(value);
            }
            if let Some(graph) = map.get("@graph")
                && let Some(found) = find_job_posting(graph, depth + 1)
            {
                return Some(found);
            }
            map.iter()
                .filter(|(key, _)| key.as_str() != "@graph")
                .find_map(|(_, v)| find_job_posting(v, depth + 1))
        }
        _ => None,
    }
}

fn is_job_posting(value: &Value) -> bool {
    match value.get("@type") {
        Some(Value::String(t)) => t.eq_ignore_ascii_case("JobPosting"),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .any(|t| t.eq_ignore_ascii_case("JobPosting")),
        _ => false,
    }
}

fn fill(record: &mut ExtractionRecord, posting: &Value, ctx: &PageContext<'_>) {
    if let Some(title) = string_at(posting, "title").or_else(|| string_at(posting, "name")) {
        record.set_text(Field::Title, title);
    }
    if let Some(company) = posting.get("hiringOrganization").and_then(organization_name) {
        record.set_text(Field::Company, company);
    }
    if let Some(location) = posting.get("jobLocation").and_then(location_text) {
        record.set_text(Field::Location, location);
    } else if string_at(posting, "jobLocationType")
        .is_some_and(|t| t.eq_ignore_ascii_case("TELECOMMUTE"))
    {
        record.set_text(Field::Location, "Remote");
    }
    if let Some(employment) = posting.get("employmentType").and_then(employment_type) {
        record.set_text(Field::EmploymentType, employment.as_str());
    }
    if let Some(date) = string_at(posting, "datePosted") {
        record.set_text(Field::DatePosted, date);
    }
    if let Some(description) = string_at(posting, "description") {
        record.set_block(Field::Description, ctx.description_from_html(&description));
    }
    if let Some(salary) = posting
        .get("baseSalary")
        .or_else(|| posting.get("estimatedSalary"))
        .and_then(salary_range)
    {
        record.set_salary(salary);
    }

    for (key, field) in [
        ("responsibilities", Field::Responsibilities),
        ("qualifications", Field::Qualifications),
        ("experienceRequirements", Field::Qualifications),
        ("educationRequirements", Field::Qualifications),
        ("skills", Field::Skills),
        ("jobBenefits", Field::Benefits),
    ] {
        if let Some(value) = posting.get(key) {
            let items = list_values(value, ctx);
            record.extend_list(field, items.into_iter().take(MAX_LIST_ITEMS));
        }
    }
}

fn string_at(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn organization_name(org: &Value) -> Option<String> {
    match org {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(_) => ["name", "legalName", "alternateName"]
            .iter()
            .find_map(|key| string_at(org, key)),
        Value::Array(items) => items.iter().find_map(organization_name),
        _ => None,
    }
}

/// `"locality, region, country"` from a `Place` (or list of places).
fn location_text(location: &Value) -> Option<String> {
    match location {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Array(items) => items.iter().find_map(location_text),
        Value::Object(_) => {
            let address = location.get("address");
            if let Some(Value::String(s)) = address
                && !s.trim().is_empty()
            {
                return Some(s.trim().to_string());
            }
            if let Some(address) = address.filter(|a| a.is_object()) {
                let country = address.get("addressCountry").and_then(|c| match c {
                    Value::Object(_) => string_at(c, "name"),
                    Value::String(s) => Some(s.trim().to_string()),
                    _ => None,
                });
                let parts: Vec<String> = [
                    string_at(address, "addressLocality"),
                    string_at(address, "addressRegion"),
                    country,
                ]
                .into_iter()
                .flatten()
                .filter(|p| !p.is_empty())
                .collect();
                if !parts.is_empty() {
                    return Some(parts.join(", "));
                }
            }
            string_at(location, "name")
        }
        _ => None,
    }
}

fn employment_type(value: &Value) -> Option<EmploymentType> {
    match value {
        Value::String(s) => EmploymentType::parse(s),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .find_map(EmploymentType::parse),
        _ => None,
    }
}

/// `MonetaryAmount` with either a `QuantitativeValue` or a bare number.
fn salary_range(salary: &Value) -> Option<SalaryRange> {
    let currency = string_at(salary, "currency").or_else(|| string_at(salary, "salaryCurrency"));
    let (min, max, unit) = match salary.get("value") {
        Some(value @ Value::Object(_)) => {
            let single = number_at(value, "value");
            (
                number_at(value, "minValue").or(single),
                number_at(value, "maxValue").or(single),
                string_at(value, "unitText"),
            )
        }
        Some(value) => {
            let n = as_number(value);
            (n, n, string_at(salary, "unitText"))
        }
        None => (
            number_at(salary, "minValue"),
            number_at(salary, "maxValue"),
            string_at(salary, "unitText"),
        ),
    };
    let range = SalaryRange {
        min,
        max,
        currency,
        period: unit.as_deref().and_then(SalaryPeriod::parse),
    };
    (!range.is_empty()).then_some(range)
}

fn number_at(value: &Value, key: &str) -> Option<f64> {
    value.get(key).and_then(as_number)
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.replace([',', '$'], "").trim().parse().ok(),
        _ => None,
    }
}

/// A JSON-LD list property: an array of strings, a comma list, or an HTML
/// blob of bullets.
fn list_values(value: &Value, ctx: &PageContext<'_>) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Object(_) => string_at(v, "name"),
                _ => None,
            })
            .collect(),
        Value::String(s) if s.contains('<') || s.contains('\n') => ctx
            .description_from_html(s)
            .lines()
            .map(|line| line.trim_start_matches(['•', '-', '*', ' ']).trim().to_string())
            .filter(|line| line.len() > 2)
            .collect(),
        Value::String(s) => s
            .split(',')
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}
