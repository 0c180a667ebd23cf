//! Request schemas and the validation engine.
//!
//! A [`Schema`] binds a static list of [`Field`] descriptors, plus optional
//! [`CrossFieldRule`]s, to a request shape. Schemas are built in `const`
//! context and shared read-only between requests.
//!
//! # Example
//!
//! ```
//! use scoring_core::{CrossFieldRule, Field, FieldKind, Record, Schema};
//! use serde_json::json;
//!
//! static FIELDS: [Field; 2] = [
//!     Field::new("login", FieldKind::Char).required(),
//!     Field::new("email", FieldKind::Email).nullable(),
//! ];
//! static RULES: [CrossFieldRule; 1] = [CrossFieldRule::new(
//!     "email_present",
//!     |record: &Record| record.is_set("email"),
//!     "email is needed",
//! )];
//! static SIGNUP: Schema = Schema::new("signup", &FIELDS).with_rules(&RULES);
//!
//! let raw = json!({"login": "ivan", "email": "ivan@otus.ru"});
//! let record = SIGNUP.validate(raw.as_object().unwrap()).unwrap();
//! assert_eq!(record.text("login"), Some("ivan"));
//!
//! let raw = json!({"email": null});
//! let report = SIGNUP.validate(raw.as_object().unwrap()).unwrap_err();
//! assert_eq!(report.joined(), "login: required field absent");
//! ```

use chrono::NaiveDate;
use serde_json::{Map, Value};

use crate::error::{ErrorReport, ValidationError};
use crate::field::{today, Field};
use crate::record::Record;

/// A schema-level predicate over an already validated record.
#[derive(Clone, Copy)]
pub struct CrossFieldRule {
    name: &'static str,
    check: fn(&Record) -> bool,
    message: &'static str,
}

impl CrossFieldRule {
    /// Creates a rule; `check` returning `false` fails validation with `message`.
    #[must_use]
    pub const fn new(name: &'static str, check: fn(&Record) -> bool, message: &'static str) -> Self {
        Self {
            name,
            check,
            message,
        }
    }

    /// Returns the rule name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Runs the rule against a record.
    pub fn evaluate(&self, record: &Record) -> Result<(), ValidationError> {
        if (self.check)(record) {
            Ok(())
        } else {
            Err(ValidationError::schema(self.message))
        }
    }
}

impl std::fmt::Debug for CrossFieldRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrossFieldRule")
            .field("name", &self.name)
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

/// An ordered set of field descriptors describing one request shape.
#[derive(Debug, Clone, Copy)]
pub struct Schema {
    name: &'static str,
    fields: &'static [Field],
    rules: &'static [CrossFieldRule],
}

impl Schema {
    /// Creates a schema with no cross-field rules.
    #[must_use]
    pub const fn new(name: &'static str, fields: &'static [Field]) -> Self {
        Self {
            name,
            fields,
            rules: &[],
        }
    }

    /// Attaches cross-field rules, run after every field passed.
    #[must_use]
    pub const fn with_rules(self, rules: &'static [CrossFieldRule]) -> Self {
        Self { rules, ..self }
    }

    /// Returns the schema name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the field descriptors in declaration order.
    #[must_use]
    pub const fn fields(&self) -> &'static [Field] {
        self.fields
    }

    /// Returns the cross-field rules.
    #[must_use]
    pub const fn rules(&self) -> &'static [CrossFieldRule] {
        self.rules
    }

    /// Looks up a descriptor by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&'static Field> {
        self.fields.iter().find(|f| f.name() == name)
    }

    /// Returns the first field name declared twice, if any.
    #[must_use]
    pub fn duplicate_field(&self) -> Option<&'static str> {
        self.fields.iter().enumerate().find_map(|(idx, field)| {
            self.fields[..idx]
                .iter()
                .any(|earlier| earlier.name() == field.name())
                .then(|| field.name())
        })
    }

    /// Validates a raw mapping against today's date.
    pub fn validate(&self, raw: &Map<String, Value>) -> Result<Record, ErrorReport> {
        self.validate_on(raw, today())
    }

    /// Validates a raw mapping.
    ///
    /// Every field is checked and all failures are reported together, in
    /// declaration order. Cross-field rules only run once every field passed.
    /// No record is returned unless the report is empty.
    pub fn validate_on(
        &self,
        raw: &Map<String, Value>,
        today: NaiveDate,
    ) -> Result<Record, ErrorReport> {
        let mut record = Record::with_capacity(self.fields.len());
        let mut report = ErrorReport::new();

        for field in self.fields {
            match field.validate_on(raw.get(field.name()), today) {
                Ok(value) => record.insert(field.name(), value),
                Err(error) => report.push(error),
            }
        }

        if report.is_empty() {
            for rule in self.rules {
                if let Err(error) = rule.evaluate(&record) {
                    report.push(error);
                }
            }
        }

        if report.is_empty() {
            Ok(record)
        } else {
            tracing::debug!(
                schema = self.name,
                errors = report.len(),
                "validation failed"
            );
            Err(report)
        }
    }
}
