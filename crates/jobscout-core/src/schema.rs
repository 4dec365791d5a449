//! JSON Schema for the final [`JobPosting`] output.
//!
//! Validation never fails an acquisition: violations are reported as
//! strings and end up in the posting's provenance warnings.

use std::sync::LazyLock;

use serde_json::{Value, json};

use crate::models::JobPosting;

/// The output contract for a posting, as JSON Schema.
pub fn posting_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "JobPosting",
        "type": "object",
        "required": ["title", "company", "description", "sourceUrl", "retrievedAt", "provenance"],
        "properties": {
            "title": {"type": "string", "minLength": 1},
            "company": {"type": "string", "minLength": 1},
            "description": {"type": "string", "minLength": 1},
            "location": {
                "type": ["object", "null"],
                "required": ["raw", "remote"],
                "properties": {
                    "raw": {"type": "string"},
                    "remote": {"type": "boolean"},
                    "place": {"type": "object"}
                }
            },
            "employmentType": {
                "enum": ["full-time", "part-time", "contract", "temporary", "internship", "freelance", null]
            },
            "datePosted": {
                "type": ["string", "null"],
                "pattern": "^\\d{4}-\\d{2}-\\d{2}$"
            },
            "salary": {
                "type": ["object", "null"],
                "properties": {
                    "min": {"type": ["number", "null"], "minimum": 0},
                    "max": {"type": ["number", "null"], "minimum": 0},
                    "currency": {"type": ["string", "null"], "pattern": "^[A-Z]{3}$"},
                    "period": {"enum": ["hourly", "daily", "weekly", "monthly", "yearly", null]}
                }
            },
            "responsibilities": {"type": "array", "items": {"type": "string"}},
            "qualifications": {"type": "array", "items": {"type": "string"}},
            "skills": {"type": "array", "items": {"type": "string"}},
            "benefits": {"type": "array", "items": {"type": "string"}},
            "sourceUrl": {"type": "string", "pattern": "^https?://"},
            "retrievedAt": {"type": "string"},
            "provenance": {
                "type": "object",
                "required": ["extractionMethod", "confidenceScore", "fieldSources", "warnings"],
                "properties": {
                    "extractionMethod": {"type": "string"},
                    "confidenceScore": {"type": "number", "minimum": 0, "maximum": 1},
                    "fieldSources": {"type": "object", "additionalProperties": {"type": "string"}},
                    "warnings": {"type": "array", "items": {"type": "string"}}
                }
            }
        }
    })
}

static VALIDATOR: LazyLock<Result<jsonschema::Validator, String>> =
    LazyLock::new(|| jsonschema::validator_for(&posting_schema()).map_err(|e| e.to_string()));

/// Validate an arbitrary JSON value against the posting schema.
pub fn validate_value(instance: &Value) -> Vec<String> {
    match &*VALIDATOR {
        Ok(validator) => validator
            .iter_errors(instance)
            .map(|e| format!("schema: {e}"))
            .collect(),
        Err(e) => vec![format!("schema: validator unavailable: {e}")],
    }
}

/// Validate a posting, returning one message per violation.
pub fn validate_posting(posting: &JobPosting) -> Vec<String> {
    match serde_json::to_value(posting) {
        Ok(value) => validate_value(&value),
        Err(e) => vec![format!("schema: posting could not be serialized: {e}")],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Value {
        json!({
            "title": "Backend Engineer",
            "company": "Acme",
            "description": "Build things.",
            "location": {"raw": "Remote", "remote": true},
            "employmentType": "full-time",
            "datePosted": "2025-01-15",
            "salary": {"min": 100000.0, "max": 150000.0, "currency": "USD", "period": "yearly"},
            "responsibilities": [],
            "qualifications": [],
            "skills": ["Rust"],
            "benefits": [],
            "sourceUrl": "https://jobs.example.com/1",
            "retrievedAt": "2025-01-20T10:00:00Z",
            "provenance": {
                "extractionMethod": "json-ld",
                "confidenceScore": 0.95,
                "fieldSources": {"title": "json-ld"},
                "warnings": []
            }
        })
    }

    #[test]
    fn schema_compiles() {
        assert!(VALIDATOR.is_ok());
    }

    #[test]
    fn valid_posting_has_no_violations() {
        assert!(validate_value(&valid()).is_empty());
    }

    #[test]
    fn violations_are_reported_not_raised() {
        let mut bad = valid();
        bad["title"] = json!("");
        bad["salary"]["currency"] = json!("dollars");
        bad["employmentType"] = json!("gig");
        let errors = validate_value(&bad);
        assert_eq!(errors.len(), 3, "{errors:?}");
        assert!(errors.iter().all(|e| e.starts_with("schema: ")));
    }
}
