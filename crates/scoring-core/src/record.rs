//! Converted field values and validated records.

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Caller gender as accepted by the gender field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    /// `0`
    Unknown,
    /// `1`
    Male,
    /// `2`
    Female,
}

impl Gender {
    /// Maps the wire code onto a gender.
    #[must_use]
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Unknown),
            1 => Some(Self::Male),
            2 => Some(Self::Female),
            _ => None,
        }
    }
}

/// A value after validation and conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Plain, email and phone fields. Integer phones arrive here as strings.
    Text(String),
    /// The `arguments` mapping of the envelope.
    Object(Map<String, Value>),
    /// Date and birthday fields.
    Date(NaiveDate),
    /// The gender field.
    Gender(Gender),
    /// The client id list.
    ClientIds(Vec<u64>),
}

/// The result of a successful validation: every schema field mapped to its
/// converted value, or `None` when absent or null.
///
/// Field order follows the schema declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Record {
    values: IndexMap<&'static str, Option<FieldValue>>,
}

impl Record {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            values: IndexMap::with_capacity(capacity),
        }
    }

    pub(crate) fn insert(&mut self, name: &'static str, value: Option<FieldValue>) {
        self.values.insert(name, value);
    }

    /// Returns the converted value of a field, `None` if absent or null.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name).and_then(Option::as_ref)
    }

    /// Returns `true` if the field is present with a non-null value.
    #[must_use]
    pub fn is_set(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns the names of all fields that hold a non-null value.
    #[must_use]
    pub fn present_fields(&self) -> Vec<&'static str> {
        self.values
            .iter()
            .filter(|(_, value)| value.is_some())
            .map(|(name, _)| *name)
            .collect()
    }

    /// Returns the number of fields in the record, null or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the schema had no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Text value of a field.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(FieldValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    /// Mapping value of a field.
    #[must_use]
    pub fn object(&self, name: &str) -> Option<&Map<String, Value>> {
        match self.get(name) {
            Some(FieldValue::Object(map)) => Some(map),
            _ => None,
        }
    }

    /// Date value of a field.
    #[must_use]
    pub fn date(&self, name: &str) -> Option<NaiveDate> {
        match self.get(name) {
            Some(FieldValue::Date(date)) => Some(*date),
            _ => None,
        }
    }

    /// Gender value of a field.
    #[must_use]
    pub fn gender(&self, name: &str) -> Option<Gender> {
        match self.get(name) {
            Some(FieldValue::Gender(gender)) => Some(*gender),
            _ => None,
        }
    }

    /// Client id list of a field.
    #[must_use]
    pub fn client_ids(&self, name: &str) -> Option<&[u64]> {
        match self.get(name) {
            Some(FieldValue::ClientIds(ids)) => Some(ids),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gender_codes() {
        assert_eq!(Gender::from_code(0), Some(Gender::Unknown));
        assert_eq!(Gender::from_code(2), Some(Gender::Female));
        assert_eq!(Gender::from_code(3), None);
        assert_eq!(Gender::from_code(-1), None);
    }

    #[test]
    fn test_record_accessors() {
        let mut record = Record::with_capacity(3);
        record.insert("first_name", Some(FieldValue::Text("Ivan".into())));
        record.insert("last_name", None);
        record.insert("client_ids", Some(FieldValue::ClientIds(vec![1, 2])));

        assert_eq!(record.len(), 3);
        assert_eq!(record.text("first_name"), Some("Ivan"));
        assert_eq!(record.text("last_name"), None);
        assert!(!record.is_set("last_name"));
        assert_eq!(record.client_ids("client_ids"), Some(&[1, 2][..]));
        // Wrong accessor for the stored variant.
        assert_eq!(record.date("first_name"), None);
        assert_eq!(record.present_fields(), vec!["first_name", "client_ids"]);
    }
}
