use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::util::collapse_whitespace;

/// Extraction methods, in merge priority order (earlier wins).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MethodKind {
    #[serde(rename = "json-ld")]
    JsonLd,
    #[serde(rename = "site-profile")]
    SiteProfile,
    #[serde(rename = "microdata")]
    Microdata,
    #[serde(rename = "dom")]
    Dom,
    #[serde(rename = "regex")]
    Regex,
}

impl MethodKind {
    pub const ALL: [MethodKind; 5] = [
        MethodKind::JsonLd,
        MethodKind::SiteProfile,
        MethodKind::Microdata,
        MethodKind::Dom,
        MethodKind::Regex,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MethodKind::JsonLd => "json-ld",
            MethodKind::SiteProfile => "site-profile",
            MethodKind::Microdata => "microdata",
            MethodKind::Dom => "dom",
            MethodKind::Regex => "regex",
        }
    }

    /// Default confidence of values produced by this method.
    pub fn base_confidence(&self) -> f64 {
        match self {
            MethodKind::JsonLd => 0.95,
            MethodKind::SiteProfile => 0.90,
            MethodKind::Microdata => 0.80,
            MethodKind::Dom => 0.60,
            MethodKind::Regex => 0.45,
        }
    }
}

impl fmt::Display for MethodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a field of the final posting came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    Method(MethodKind),
    /// Filled in by the normalizer.
    Repair,
}

impl FieldSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldSource::Method(m) => m.as_str(),
            FieldSource::Repair => "repair",
        }
    }
}

impl Serialize for FieldSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl fmt::Display for FieldSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields of a job posting that extraction methods can populate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Title,
    Company,
    Location,
    EmploymentType,
    DatePosted,
    Description,
    Salary,
    Responsibilities,
    Qualifications,
    Skills,
    Benefits,
}

impl Field {
    pub fn is_list(&self) -> bool {
        matches!(
            self,
            Field::Responsibilities | Field::Qualifications | Field::Skills | Field::Benefits
        )
    }
}

/// Canonical employment types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmploymentType {
    FullTime,
    PartTime,
    Contract,
    Temporary,
    Internship,
    Freelance,
}

const EMPLOYMENT_ALIASES: &[(&str, EmploymentType)] = &[
    ("full time", EmploymentType::FullTime),
    ("fulltime", EmploymentType::FullTime),
    ("permanent", EmploymentType::FullTime),
    ("part time", EmploymentType::PartTime),
    ("parttime", EmploymentType::PartTime),
    ("contract", EmploymentType::Contract),
    ("contractor", EmploymentType::Contract),
    ("contract to hire", EmploymentType::Contract),
    ("consulting", EmploymentType::Contract),
    ("consultant", EmploymentType::Contract),
    ("temporary", EmploymentType::Temporary),
    ("temp", EmploymentType::Temporary),
    ("seasonal", EmploymentType::Temporary),
    ("intern", EmploymentType::Internship),
    ("internship", EmploymentType::Internship),
    ("co op", EmploymentType::Internship),
    ("freelance", EmploymentType::Freelance),
    ("freelancer", EmploymentType::Freelance),
];

impl EmploymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmploymentType::FullTime => "full-time",
            EmploymentType::PartTime => "part-time",
            EmploymentType::Contract => "contract",
            EmploymentType::Temporary => "temporary",
            EmploymentType::Internship => "internship",
            EmploymentType::Freelance => "freelance",
        }
    }

    /// Map any alias ("Full Time", "FULL_TIME", "fulltime", ...) to a
    /// canonical value.
    ///
    /// An exact alias match wins; otherwise the first alias (in table
    /// order) appearing as a whole phrase in the input is used.
    pub fn parse(raw: &str) -> Option<Self> {
        let key = alias_key(raw);
        if key.is_empty() {
            return None;
        }
        if let Some((_, ty)) = EMPLOYMENT_ALIASES.iter().find(|(alias, _)| *alias == key) {
            return Some(*ty);
        }
        let padded = format!(" {key} ");
        EMPLOYMENT_ALIASES
            .iter()
            .find(|(alias, _)| padded.contains(&format!(" {alias} ")))
            .map(|(_, ty)| *ty)
    }
}

impl fmt::Display for EmploymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn alias_key(raw: &str) -> String {
    let replaced: String = raw
        .chars()
        .map(|c| {
            if c == '_' || c == '-' || c == '/' || c == ',' || c == '(' || c == ')' {
                ' '
            } else {
                c.to_ascii_lowercase()
            }
        })
        .collect();
    collapse_whitespace(&replaced)
}

/// Pay period of a salary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SalaryPeriod {
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl SalaryPeriod {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "hour" | "hourly" | "hr" | "per hour" => Some(SalaryPeriod::Hourly),
            "day" | "daily" => Some(SalaryPeriod::Daily),
            "week" | "weekly" | "wk" => Some(SalaryPeriod::Weekly),
            "month" | "monthly" | "mo" => Some(SalaryPeriod::Monthly),
            "year" | "yearly" | "annual" | "annually" | "annum" | "yr" => {
                Some(SalaryPeriod::Yearly)
            }
            _ => None,
        }
    }
}

/// Compensation range.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SalaryRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub currency: Option<String>,
    pub period: Option<SalaryPeriod>,
}

impl SalaryRange {
    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// Structured place parsed from a location string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Place {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// Job location: raw text plus whatever structure could be recovered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobLocation {
    pub raw: String,
    pub remote: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place: Option<Place>,
}

/// Which method supplied each field, and what had to be repaired.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    pub extraction_method: FieldSource,
    pub confidence_score: f64,
    pub field_sources: BTreeMap<Field, FieldSource>,
    pub warnings: Vec<String>,
}

/// The standardized job record produced by an acquisition.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPosting {
    pub title: String,
    pub company: String,
    pub location: Option<JobLocation>,
    pub employment_type: Option<EmploymentType>,
    pub date_posted: Option<String>,
    pub description: String,
    pub salary: Option<SalaryRange>,
    pub responsibilities: Vec<String>,
    pub qualifications: Vec<String>,
    pub skills: Vec<String>,
    pub benefits: Vec<String>,
    pub source_url: String,
    pub retrieved_at: DateTime<Utc>,
    pub provenance: Provenance,
}

/// DTO handed to a [`crate::traits::PostingStore`].
#[derive(Debug, Clone, Serialize)]
pub struct NewPosting {
    pub source_url: String,
    /// SHA-256 of the serialized posting minus volatile fields (for change detection).
    pub data_hash: String,
    pub posting: JobPosting,
}

impl NewPosting {
    pub fn from_posting(posting: JobPosting) -> Result<Self, serde_json::Error> {
        let mut value = serde_json::to_value(&posting)?;
        if let Some(obj) = value.as_object_mut() {
            obj.remove("retrievedAt");
        }
        Ok(Self {
            source_url: posting.source_url.clone(),
            data_hash: compute_hash(&value.to_string()),
            posting,
        })
    }
}

/// Compute a SHA-256 hash of a string, returned as 64-char hex.
pub fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
