//! `itemprop` microdata (schema.org/JobPosting in HTML attributes).

use jobscout_core::error::AppError;
use jobscout_core::models::{EmploymentType, Field, MethodKind, SalaryPeriod, SalaryRange};
use jobscout_core::record::ExtractionRecord;

use super::{PageContext, list_items};
use crate::dom::{DomNode, DomQuery};

pub fn extract<D: DomQuery>(doc: &D, ctx: &PageContext<'_>) -> Result<ExtractionRecord, AppError> {
    let mut record = ExtractionRecord::new(MethodKind::Microdata);
    let Some(scope) = doc.select_one("[itemscope][itemtype*='JobPosting']") else {
        return Ok(record);
    };

    if let Some(title) = prop_text(&scope, "title") {
        record.set_text(Field::Title, title);
    }
    if let Some(org) = scope.select_one("[itemprop='hiringOrganization']") {
        let name = prop_text(&org, "name").unwrap_or_else(|| org.value_text());
        record.set_text(Field::Company, name);
    }
    if let Some(place) = scope.select_one("[itemprop='jobLocation']") {
        let parts: Vec<String> = ["addressLocality", "addressRegion", "addressCountry"]
            .iter()
            .filter_map(|prop| prop_text(&place, prop))
            .collect();
        if parts.is_empty() {
            record.set_text(Field::Location, place.value_text());
        } else {
            record.set_text(Field::Location, parts.join(", "));
        }
    }
    if let Some(employment) = prop_text(&scope, "employmentType").and_then(|raw| EmploymentType::parse(&raw)) {
        record.set_text(Field::EmploymentType, employment.as_str());
    }
    if let Some(date) = prop_text(&scope, "datePosted") {
        record.set_text(Field::DatePosted, date);
    }
    if let Some(node) = scope.select_one("[itemprop='description']") {
        let text = match node.attr("content") {
            Some(content) => ctx.description_from_html(content),
            None => ctx.description_of(&node),
        };
        record.set_block(Field::Description, text);
    }
    if let Some(salary) = salary(&scope) {
        record.set_salary(salary);
    }

    for (prop, field) in [
        ("responsibilities", Field::Responsibilities),
        ("qualifications", Field::Qualifications),
        ("experienceRequirements", Field::Qualifications),
        ("skills", Field::Skills),
        ("jobBenefits", Field::Benefits),
    ] {
        for node in scope.select_all(&format!("[itemprop='{prop}']")) {
            let items = list_items(&node);
            if !items.is_empty() {
                record.extend_list(field, items);
            } else if field == Field::Skills {
                record.extend_list(field, node.value_text().split(','));
            } else {
                record.extend_list(field, [node.value_text()]);
            }
        }
    }

    Ok(record)
}

fn prop_text<N: DomNode>(scope: &N, prop: &str) -> Option<String> {
    scope
        .select_all(&format!("[itemprop='{prop}']"))
        .iter()
        .map(DomNode::value_text)
        .find(|text| !text.is_empty())
}

fn salary<N: DomNode>(scope: &N) -> Option<SalaryRange> {
    let node = scope.select_one("[itemprop='baseSalary']");
    let within = node.as_ref().unwrap_or(scope);
    let number = |prop: &str| {
        prop_text(within, prop).and_then(|raw| raw.replace([',', '$'], "").trim().parse::<f64>().ok())
    };
    let single = number("value");
    let range = SalaryRange {
        min: number("minValue").or(single),
        max: number("maxValue").or(single),
        currency: prop_text(within, "currency")
            .or_else(|| prop_text(scope, "salaryCurrency"))
            .map(|c| c.to_ascii_uppercase()),
        period: prop_text(within, "unitText").and_then(|u| SalaryPeriod::parse(&u)),
    };
    (!range.is_empty()).then_some(range)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaner::TextCleaner;
    use crate::dom::HtmlDocument;

    fn run(html: &str) -> ExtractionRecord {
        let cleaner = TextCleaner::new();
        let ctx = PageContext::new("https://acme.example/jobs/7", &cleaner);
        extract(&HtmlDocument::parse(html), &ctx).unwrap()
    }

    #[test]
    fn test_microdata_posting() {
        let html = r#"<html><body>
          <div itemscope itemtype="https://schema.org/JobPosting">
            <h1 itemprop="title">QA Engineer</h1>
            <div itemprop="hiringOrganization" itemscope itemtype="https://schema.org/Organization">
              <span itemprop="name">Umbrella</span></div>
            <div itemprop="jobLocation" itemscope><div itemprop="address" itemscope>
              <span itemprop="addressLocality">Berlin</span>
              <span itemprop="addressCountry">Germany</span></div></div>
            <meta itemprop="employmentType" content="PART_TIME">
            <time itemprop="datePosted" datetime="2025-03-01">March 1</time>
            <div itemprop="description"><p>Test the things that matter.</p></div>
            <div itemprop="baseSalary" itemscope>
              <meta itemprop="currency" content="eur">
              <meta itemprop="minValue" content="40000">
              <meta itemprop="maxValue" content="55000">
              <meta itemprop="unitText" content="YEAR"></div>
            <ul itemprop="skills"><li>Selenium</li><li>Python</li></ul>
          </div></body></html>"#;
        let record = run(html);

        assert_eq!(record.text(Field::Title), Some("QA Engineer"));
        assert_eq!(record.text(Field::Company), Some("Umbrella"));
        assert_eq!(record.text(Field::Location), Some("Berlin, Germany"));
        assert_eq!(record.text(Field::EmploymentType), Some("part-time"));
        assert_eq!(record.text(Field::DatePosted), Some("2025-03-01"));
        assert_eq!(record.text(Field::Description), Some("Test the things that matter."));
        assert_eq!(record.list(Field::Skills), ["Selenium", "Python"]);
        let salary = record.salary().unwrap();
        assert_eq!(salary.min, Some(40_000.0));
        assert_eq!(salary.currency.as_deref(), Some("EUR"));
        assert_eq!(salary.period, Some(SalaryPeriod::Yearly));
    }

    #[test]
    fn test_page_without_microdata_is_empty() {
        assert!(run("<html><body><h1>Hello</h1></body></html>").is_empty());
    }

    #[test]
    fn test_itemprops_outside_a_posting_are_ignored() {
        let html = r#"<html><body>
          <h1>Platform Engineer</h1>
          <footer itemscope itemtype="https://schema.org/Organization">
            <span itemprop="name">Acme Holdings</span>
            <span itemprop="title">Investor relations</span>
            <span itemprop="description">Acme Holdings is a family of brands.</span>
          </footer></body></html>"#;
        assert!(run(html).is_empty());
    }
}
