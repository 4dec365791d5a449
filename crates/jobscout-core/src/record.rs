//! Per-method partial records produced by extraction.

use std::collections::BTreeMap;

use crate::models::{Field, MethodKind, SalaryRange};
use crate::util::collapse_whitespace;

/// A single extracted value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Salary(SalaryRange),
    List(Vec<String>),
}

impl FieldValue {
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::Salary(s) => s.is_empty(),
            FieldValue::List(items) => items.iter().all(|i| i.trim().is_empty()),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }
}

/// The fields one extraction method found, with per-field confidence.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionRecord {
    pub method: MethodKind,
    pub confidence: f64,
    pub values: BTreeMap<Field, FieldValue>,
    pub field_confidence: BTreeMap<Field, f64>,
}

impl ExtractionRecord {
    pub fn new(method: MethodKind) -> Self {
        Self {
            method,
            confidence: method.base_confidence(),
            values: BTreeMap::new(),
            field_confidence: BTreeMap::new(),
        }
    }

    /// An explicit "found nothing" record.
    pub fn empty(method: MethodKind) -> Self {
        Self::new(method)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Set a value unless it is empty or the field is already set.
    pub fn set(&mut self, field: Field, value: FieldValue) {
        if value.is_empty() || self.values.contains_key(&field) {
            return;
        }
        self.field_confidence.insert(field, self.confidence);
        self.values.insert(field, value);
    }

    /// Set a text field from raw text (whitespace is collapsed).
    pub fn set_text(&mut self, field: Field, text: impl AsRef<str>) {
        let cleaned = collapse_whitespace(text.as_ref());
        self.set(field, FieldValue::Text(cleaned));
    }

    /// Set a multi-line text field, keeping line breaks but trimming lines.
    pub fn set_block(&mut self, field: Field, text: impl AsRef<str>) {
        let lines: Vec<String> = text
            .as_ref()
            .lines()
            .map(collapse_whitespace)
            .collect();
        let mut block = String::new();
        let mut blank = false;
        for line in lines {
            if line.is_empty() {
                blank = !block.is_empty();
                continue;
            }
            if !block.is_empty() {
                block.push_str(if blank { "\n\n" } else { "\n" });
            }
            blank = false;
            block.push_str(&line);
        }
        self.set(field, FieldValue::Text(block));
    }

    /// Append items to a list field, skipping blanks and case-insensitive repeats.
    pub fn extend_list<I, S>(&mut self, field: Field, items: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entry = self
            .values
            .entry(field)
            .or_insert_with(|| FieldValue::List(Vec::new()));
        if let FieldValue::List(list) = entry {
            for item in items {
                let item = collapse_whitespace(item.as_ref());
                if item.is_empty() || list.iter().any(|e| e.eq_ignore_ascii_case(&item)) {
                    continue;
                }
                list.push(item);
            }
        }
        if self.values.get(&field).is_some_and(FieldValue::is_empty) {
            self.values.remove(&field);
        } else {
            self.field_confidence.insert(field, self.confidence);
        }
    }

    pub fn set_salary(&mut self, salary: SalaryRange) {
        self.set(Field::Salary, FieldValue::Salary(salary));
    }

    pub fn text(&self, field: Field) -> Option<&str> {
        self.values.get(&field).and_then(FieldValue::as_text)
    }

    pub fn list(&self, field: Field) -> &[String] {
        self.values
            .get(&field)
            .and_then(FieldValue::as_list)
            .unwrap_or(&[])
    }

    pub fn salary(&self) -> Option<&SalaryRange> {
        match self.values.get(&Field::Salary) {
            Some(FieldValue::Salary(s)) => Some(s),
            _ => None,
        }
    }
}
