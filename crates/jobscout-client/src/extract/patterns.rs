//! Last-resort text mining: a skill vocabulary and salary ranges.

use std::sync::LazyLock;

use jobscout_core::error::AppError;
use jobscout_core::models::{Field, MethodKind, SalaryPeriod, SalaryRange};
use jobscout_core::record::ExtractionRecord;
use regex::{Captures, Regex};

use super::PageContext;
use crate::dom::{DomNode, DomQuery};

/// At most this many skills per page.
const MAX_SKILLS: usize = 50;

/// Canonical skill name and the pattern that finds it.
const SKILL_PATTERNS: &[(&str, &str)] = &[
    ("JavaScript", r"(?i)\bjavascript\b"),
    ("TypeScript", r"(?i)\btypescript\b"),
    ("Python", r"(?i)\bpython\b"),
    ("Java", r"(?i)\bjava\b"),
    ("C++", r"(?i)(?:^|[^\w+])c\+\+"),
    ("C#", r"(?i)(?:^|[^\w#])c#"),
    ("Go", r"(?i)\bgolang\b|\bGo(?:,|/| and | or |\))"),
    ("Rust", r"\bRust\b"),
    ("PHP", r"(?i)\bphp\b"),
    ("Ruby", r"(?i)\bruby\b"),
    ("Swift", r"\bSwift\b"),
    ("Kotlin", r"(?i)\bkotlin\b"),
    ("Scala", r"(?i)\bscala\b"),
    ("React", r"(?i)\breact(?:\.js|js)?\b"),
    ("Vue", r"(?i)\bvue(?:\.js|js)?\b"),
    ("Angular", r"(?i)\bangular(?:js)?\b"),
    ("Svelte", r"(?i)\bsvelte\b"),
    ("Node.js", r"(?i)\bnode(?:\.js|js)\b"),
    ("Express", r"\bExpress(?:\.js)?\b"),
    ("Django", r"(?i)\bdjango\b"),
    ("Flask", r"(?i)\bflask\b"),
    ("FastAPI", r"(?i)\bfastapi\b"),
    ("Spring", r"\bSpring(?: Boot)?\b"),
    ("Rails", r"\bRails\b|(?i)\bruby on rails\b"),
    ("AWS", r"\bAWS\b|(?i)\bamazon web services\b"),
    ("Azure", r"(?i)\bazure\b"),
    ("GCP", r"\bGCP\b|(?i)\bgoogle cloud\b"),
    ("Docker", r"(?i)\bdocker\b"),
    ("Kubernetes", r"(?i)\bkubernetes\b|\bk8s\b"),
    ("Terraform", r"(?i)\bterraform\b"),
    ("Jenkins", r"(?i)\bjenkins\b"),
    ("Git", r"(?i)\bgit\b"),
    ("Linux", r"(?i)\blinux\b"),
    ("PostgreSQL", r"(?i)\bpostgres(?:ql)?\b"),
    ("MySQL", r"(?i)\bmysql\b"),
    ("MongoDB", r"(?i)\bmongo(?:db)?\b"),
    ("Redis", r"(?i)\bredis\b"),
    ("Kafka", r"(?i)\bkafka\b"),
    ("Elasticsearch", r"(?i)\belastic ?search\b"),
    ("HTML", r"\bHTML5?\b"),
    ("CSS", r"\bCSS3?\b"),
    ("SQL", r"\bSQL\b"),
    ("REST", r"\bREST(?:ful)?\b"),
    ("GraphQL", r"(?i)\bgraphql\b"),
    ("gRPC", r"(?i)\bgrpc\b"),
    ("CI/CD", r"(?i)\bci/cd\b"),
    ("DevOps", r"(?i)\bdevops\b"),
    ("Machine Learning", r"(?i)\bmachine learning\b"),
    ("Agile", r"(?i)\bagile\b"),
    ("Scrum", r"(?i)\bscrum\b"),
];

static SKILLS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    SKILL_PATTERNS
        .iter()
        .map(|(name, pattern)| (*name, Regex::new(pattern).expect("skill regex")))
        .collect()
});

static SALARY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)
        (?:(?P<label>\bsalary|\bcompensation|\bpay|\bwages?)\s*:?\s*)?
        (?P<cur>[$€£]|\busd|\beur|\bgbp)?\s*
        (?P<min>\d{1,3}(?:,\d{3})+|\d+(?:\.\d+)?)\s*(?P<k1>k\b|thousand\b)?
        \s*(?:-|–|—|to)\s*
        (?P<cur2>[$€£]|usd|eur|gbp)?\s*
        (?P<max>\d{1,3}(?:,\d{3})+|\d+(?:\.\d+)?)\s*(?P<k2>k\b|thousand\b)?
        (?:\s*(?P<cur3>usd\b|eur\b|gbp\b))?
        (?:\s*(?:per|/|an|a)\s*(?P<period>hour|hr|year|yr|annum|month|week|day)\b)?",
    )
    .expect("salary regex")
});

pub fn extract<D: DomQuery>(doc: &D, _ctx: &PageContext<'_>) -> Result<ExtractionRecord, AppError> {
    let mut record = ExtractionRecord::new(MethodKind::Regex);
    let text = doc.root().text();
    if text.is_empty() {
        return Ok(record);
    }

    record.extend_list(Field::Skills, find_skills(&text));
    if let Some(salary) = find_salary(&text) {
        record.set_salary(salary);
    }
    Ok(record)
}

/// Skills from the vocabulary that appear in `text`, in vocabulary order.
pub fn find_skills(text: &str) -> Vec<&'static str> {
    SKILLS
        .iter()
        .filter(|(_, re)| re.is_match(text))
        .map(|(name, _)| *name)
        .take(MAX_SKILLS)
        .collect()
}

/// The first number range in `text` that is clearly about pay.
///
/// Only the matched text counts: a currency, a `k`/`thousand` multiplier,
/// a pay period, or a `Salary:` style label directly in front of the
/// numbers. Date ranges like `2025-01-15 to 2025-02-01` carry none of those.
pub fn find_salary(text: &str) -> Option<SalaryRange> {
    SALARY_RE
        .captures_iter(text)
        .find(is_pay)
        .and_then(|caps| to_range(&caps))
}

fn is_pay(caps: &Captures<'_>) -> bool {
    ["label", "cur", "cur2", "cur3", "k1", "k2", "period"]
        .iter()
        .any(|name| caps.name(name).is_some())
}

fn to_range(caps: &Captures<'_>) -> Option<SalaryRange> {
    let thousands = caps.name("k1").is_some() || caps.name("k2").is_some();
    let amount = |name: &str| -> Option<f64> {
        let raw = caps.name(name)?.as_str().replace(',', "");
        let value: f64 = raw.parse().ok()?;
        Some(if thousands { value * 1000.0 } else { value })
    };
    let (mut min, mut max) = (amount("min")?, amount("max")?);
    if min <= 0.0 || max <= 0.0 {
        return None;
    }
    if min > max {
        std::mem::swap(&mut min, &mut max);
    }

    let currency = ["cur", "cur2", "cur3"]
        .iter()
        .find_map(|name| caps.name(name))
        .map(|m| match m.as_str() {
            "$" => "USD".to_string(),
            "€" => "EUR".to_string(),
            "£" => "GBP".to_string(),
            code => code.to_ascii_uppercase(),
        });
    let period = caps
        .name("period")
        .and_then(|m| SalaryPeriod::parse(m.as_str()))
        .or((max >= 1000.0).then_some(SalaryPeriod::Yearly));

    Some(SalaryRange {
        min: Some(min),
        max: Some(max),
        currency,
        period,
    })
}
