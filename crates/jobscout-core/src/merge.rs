//! Priority merge of per-method extraction records.
//!
//! Records are ordered by method priority (then by descending confidence).
//! Scalar fields take the first non-empty value; list fields are unioned
//! across every record with case-insensitive de-duplication. The source of
//! each field is the first method that supplied it.

use std::collections::BTreeMap;

use crate::models::{Field, MethodKind};
use crate::record::{ExtractionRecord, FieldValue};

/// Merged view over all extraction records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedRecord {
    pub values: BTreeMap<Field, FieldValue>,
    pub sources: BTreeMap<Field, MethodKind>,
    /// Method that supplied the title, or the best method that supplied anything.
    pub primary_method: Option<MethodKind>,
    pub confidence: f64,
    /// Methods that contributed at least one field, in priority order.
    pub contributors: Vec<MethodKind>,
}

impl MergedRecord {
    pub fn text(&self, field: Field) -> Option<&str> {
        self.values.get(&field).and_then(FieldValue::as_text)
    }

    pub fn list(&self, field: Field) -> &[String] {
        self.values
            .get(&field)
            .and_then(FieldValue::as_list)
            .unwrap_or(&[])
    }
}

/// Merge records deterministically, regardless of input order.
pub fn merge_records(mut records: Vec<ExtractionRecord>) -> MergedRecord {
    records.sort_by(|a, b| {
        a.method
            .cmp(&b.method)
            .then_with(|| b.confidence.total_cmp(&a.confidence))
    });

    let mut merged = MergedRecord::default();
    let mut field_confidence: BTreeMap<Field, f64> = BTreeMap::new();

    for record in &records {
        let mut contributed = false;
        for (field, value) in &record.values {
            if value.is_empty() {
                continue;
            }
            if field.is_list() {
                if union_list(&mut merged.values, *field, value) {
                    contributed = true;
                    merged.sources.entry(*field).or_insert(record.method);
                }
            } else if !merged.values.contains_key(field) {
                merged.values.insert(*field, value.clone());
                merged.sources.insert(*field, record.method);
                field_confidence.insert(
                    *field,
                    record
                        .field_confidence
                        .get(field)
                        .copied()
                        .unwrap_or(record.confidence),
                );
                contributed = true;
            }
        }
        if contributed && !merged.contributors.contains(&record.method) {
            merged.contributors.push(record.method);
        }
    }

    merged.primary_method = merged
        .sources
        .get(&Field::Title)
        .copied()
        .or_else(|| merged.contributors.first().copied());

    merged.confidence = match (merged.sources.get(&Field::Title), merged.primary_method) {
        (Some(_), _) => field_confidence.get(&Field::Title).copied().unwrap_or(0.0),
        (None, Some(method)) => records
            .iter()
            .find(|r| r.method == method)
            .map(|r| r.confidence)
            .unwrap_or(0.0),
        (None, None) => 0.0,
    };

    merged
}

/// Union `value` into the list at `field`. Returns true if anything was added.
fn union_list(values: &mut BTreeMap<Field, FieldValue>, field: Field, value: &FieldValue) -> bool {
    let Some(incoming) = value.as_list() else {
        return false;
    };
    let entry = values
        .entry(field)
        .or_insert_with(|| FieldValue::List(Vec::new()));
    let FieldValue::List(existing) = entry else {
        return false;
    };

    let mut added = false;
    for item in incoming {
        let item = item.trim();
        if item.is_empty() || existing.iter().any(|e| e.to_lowercase() == item.to_lowercase()) {
            continue;
        }
        existing.push(item.to_string());
        added = true;
    }
    added
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SalaryRange;

    fn record(method: MethodKind, fields: &[(Field, &str)]) -> ExtractionRecord {
        let mut r = ExtractionRecord::new(method);
        for (field, value) in fields {
            r.set_text(*field, value);
        }
        r
    }

    #[test]
    fn scalar_takes_highest_priority_value() {
        let records = vec![
            record(MethodKind::Dom, &[(Field::Title, "Dom Title")]),
            record(MethodKind::JsonLd, &[(Field::Title, "Ld Title")]),
            record(MethodKind::Regex, &[(Field::Title, "Regex Title")]),
        ];
        let merged = merge_records(records);
        assert_eq!(merged.text(Field::Title), Some("Ld Title"));
        assert_eq!(merged.sources[&Field::Title], MethodKind::JsonLd);
        assert_eq!(merged.primary_method, Some(MethodKind::JsonLd));
        assert_eq!(merged.confidence, 0.95);
    }

    #[test]
    fn merge_is_order_independent() {
        let a = record(MethodKind::SiteProfile, &[(Field::Company, "Lever Co")]);
        let b = record(
            MethodKind::Microdata,
            &[(Field::Company, "Micro Co"), (Field::Location, "Berlin")],
        );
        let c = record(MethodKind::Dom, &[(Field::Title, "Engineer")]);

        let forward = merge_records(vec![a.clone(), b.clone(), c.clone()]);
        let backward = merge_records(vec![c, b, a]);
        assert_eq!(forward, backward);
        assert_eq!(forward.text(Field::Company), Some("Lever Co"));
        assert_eq!(forward.sources[&Field::Location], MethodKind::Microdata);
    }

    #[test]
    fn lists_are_unioned_across_methods() {
        let mut ld = ExtractionRecord::new(MethodKind::JsonLd);
        ld.extend_list(Field::Skills, ["Rust", "SQL"]);
        let mut regex = ExtractionRecord::new(MethodKind::Regex);
        regex.extend_list(Field::Skills, ["sql", "Docker"]);

        let merged = merge_records(vec![regex, ld]);
        assert_eq!(merged.list(Field::Skills), ["Rust", "SQL", "Docker"]);
        assert_eq!(merged.sources[&Field::Skills], MethodKind::JsonLd);
        assert_eq!(
            merged.contributors,
            vec![MethodKind::JsonLd, MethodKind::Regex]
        );
    }

    #[test]
    fn primary_falls_back_to_best_contributor_without_title() {
        let mut regex = ExtractionRecord::new(MethodKind::Regex);
        regex.set_salary(SalaryRange {
            min: Some(1.0),
            max: Some(2.0),
            currency: None,
            period: None,
        });
        let dom = record(MethodKind::Dom, &[(Field::Location, "Remote")]);

        let merged = merge_records(vec![regex, dom]);
        assert_eq!(merged.primary_method, Some(MethodKind::Dom));
        assert_eq!(merged.confidence, 0.60);
    }

    #[test]
    fn empty_input_merges_to_nothing() {
        let merged = merge_records(vec![
            ExtractionRecord::empty(MethodKind::JsonLd),
            ExtractionRecord::empty(MethodKind::Dom),
        ]);
        assert!(merged.values.is_empty());
        assert_eq!(merged.primary_method, None);
        assert_eq!(merged.confidence, 0.0);
    }
}
