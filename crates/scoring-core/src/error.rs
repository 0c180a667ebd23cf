//! Validation error types.
//!
//! A failed validation produces an [`ErrorReport`]: an ordered list of
//! [`ValidationError`]s. Field errors carry the name of the field they belong
//! to; cross-field (schema) errors do not.
//!
//! The report is the only success/failure discriminator. An empty report is
//! never returned as an error by the validation engine.

use serde::{Deserialize, Serialize};

/// Separator used when a report is rendered as one human-readable string.
pub const MESSAGE_SEPARATOR: &str = "; ";

/// A single validation failure.
///
/// # Example
///
/// ```
/// use scoring_core::ValidationError;
///
/// let err = ValidationError::field("phone", "field must be string or number");
/// assert_eq!(err.to_string(), "phone: field must be string or number");
///
/// let err = ValidationError::schema("not enough arguments");
/// assert_eq!(err.to_string(), "not enough arguments");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidationError {
    /// The field that failed, or `None` for a cross-field rule.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// The reason, without the field prefix.
    pub reason: String,
}

impl ValidationError {
    /// Creates an error qualified by a field name.
    #[must_use]
    pub fn field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            reason: reason.into(),
        }
    }

    /// Creates an unqualified error raised by a cross-field rule.
    #[must_use]
    pub fn schema(reason: impl Into<String>) -> Self {
        Self {
            field: None,
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{}: {}", field, self.reason),
            None => f.write_str(&self.reason),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Ordered collection of validation errors for one schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorReport {
    errors: Vec<ValidationError>,
}

impl ErrorReport {
    /// Creates an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an error, keeping insertion order.
    pub fn push(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Returns `true` if no errors were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of recorded errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns every error rendered as `"<field>: <reason>"` (or the bare reason).
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    /// Joins all messages into one string, as sent back to clients.
    #[must_use]
    pub fn joined(&self) -> String {
        self.messages().join(MESSAGE_SEPARATOR)
    }

    /// Returns `true` if any message equals `message` once rendered.
    #[must_use]
    pub fn contains(&self, message: &str) -> bool {
        self.errors.iter().any(|e| e.to_string() == message)
    }
}

impl std::fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.joined())
    }
}

impl std::error::Error for ErrorReport {}

impl From<ValidationError> for ErrorReport {
    fn from(error: ValidationError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_error_display() {
        let err = ValidationError::field("email", "field must be valid email address");
        assert_eq!(err.to_string(), "email: field must be valid email address");
    }

    #[test]
    fn test_schema_error_display() {
        let err = ValidationError::schema("empty client list");
        assert_eq!(err.to_string(), "empty client list");
        assert!(err.field.is_none());
    }

    #[test]
    fn test_report_keeps_order() {
        let mut report = ErrorReport::new();
        assert!(report.is_empty());

        report.push(ValidationError::field("login", "required field absent"));
        report.push(ValidationError::field("method", "field must not be null"));

        assert_eq!(report.len(), 2);
        assert_eq!(
            report.joined(),
            "login: required field absent; method: field must not be null"
        );
        assert!(report.contains("method: field must not be null"));
    }

    #[test]
    fn test_report_serialization() {
        let report = ErrorReport::from(ValidationError::schema("not enough arguments"));
        let json = serde_json::to_string(&report).expect("serialization should work");
        assert_eq!(json, r#"[{"reason":"not enough arguments"}]"#);
    }
}
