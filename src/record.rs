//! Uniform record shapes shared by every pipeline stage.
//!
//! A [`RawRecord`] is what a loader yields: field name to raw text or list of
//! texts. A [`PaperRecord`] is a raw record that was admitted and classified,
//! joined with the source it came from.

use crate::classifier::Classification;
use std::collections::BTreeMap;

/// Format-agnostic field names produced by the loaders.
pub mod field {
    pub const TITLE: &str = "title";
    pub const AUTHORS: &str = "authors";
    pub const YEAR: &str = "year";
    pub const VENUE: &str = "venue";
    pub const VOLUME: &str = "volume";
    pub const ISSUE: &str = "issue";
    pub const DOI: &str = "doi";
    pub const ABSTRACT: &str = "abstract";
    pub const KEYWORDS: &str = "keywords";
    pub const URL: &str = "url";
    pub const TYPE: &str = "type";
}

/// Raw value of a single field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
}

/// One bibliographic entry as produced by a loader.
///
/// Absent fields are simply not present; readers treat absent and empty alike.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    fields: BTreeMap<String, FieldValue>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a text field. Empty values are not stored.
    pub fn set_text(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        if value.trim().is_empty() {
            return;
        }
        self.fields.insert(key.to_string(), FieldValue::Text(value));
    }

    /// Append to a list field, creating it if needed. Empty values are dropped.
    pub fn push_list(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        match self.fields.get_mut(key) {
            Some(FieldValue::List(items)) => items.push(value.to_string()),
            Some(FieldValue::Text(existing)) => {
                let first = std::mem::take(existing);
                self.fields
                    .insert(key.to_string(), FieldValue::List(vec![first, value.to_string()]));
            }
            None => {
                self.fields
                    .insert(key.to_string(), FieldValue::List(vec![value.to_string()]));
            }
        }
    }

    /// Text of a field, or `""` when absent. List fields yield their first item.
    pub fn text(&self, key: &str) -> &str {
        match self.fields.get(key) {
            Some(FieldValue::Text(value)) => value,
            Some(FieldValue::List(items)) => items.first().map(String::as_str).unwrap_or(""),
            None => "",
        }
    }

    /// Items of a field, or an empty list when absent.
    pub fn list(&self, key: &str) -> Vec<&str> {
        match self.fields.get(key) {
            Some(FieldValue::List(items)) => items.iter().map(String::as_str).collect(),
            Some(FieldValue::Text(value)) => vec![value.as_str()],
            None => Vec::new(),
        }
    }

    pub fn has(&self, key: &str) -> bool {
        !self.text(key).trim().is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// An admitted, classified record. Created once on first occurrence.
#[derive(Debug, Clone, PartialEq)]
pub struct PaperRecord {
    pub source: String,
    pub record: RawRecord,
    pub classification: Classification,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_and_empty_read_the_same() {
        let mut record = RawRecord::new();
        record.set_text(field::DOI, "   ");
        assert_eq!(record.text(field::DOI), "");
        assert_eq!(record.text(field::URL), "");
        assert!(!record.has(field::DOI));
        assert!(record.is_empty());
    }

    #[test]
    fn test_push_list_promotes_text() {
        let mut record = RawRecord::new();
        record.set_text(field::AUTHORS, "Kim, J.");
        record.push_list(field::AUTHORS, "Lee, S.");
        assert_eq!(record.list(field::AUTHORS), vec!["Kim, J.", "Lee, S."]);
        assert_eq!(record.text(field::AUTHORS), "Kim, J.");
    }
}
