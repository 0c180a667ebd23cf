//! Field descriptors.
//!
//! A [`Field`] describes one named value of a request: whether it must be
//! present, whether it may be `null`, and which [`FieldKind`] governs its type
//! check and conversion. Descriptors are plain `Copy` data and are meant to be
//! declared in `static` arrays and bound into a [`Schema`](crate::Schema).
//!
//! Validation of one value runs four steps and stops at the first failure:
//!
//! 1. presence (`required field absent`)
//! 2. nullability (`field must not be null`)
//! 3. type check, owned by the kind
//! 4. semantic check and conversion, owned by the kind
//!
//! # Example
//!
//! ```
//! use scoring_core::{Field, FieldKind, FieldValue};
//! use serde_json::json;
//!
//! let phone = Field::new("phone", FieldKind::Phone).nullable();
//!
//! let value = phone.validate(Some(&json!(79991234567_u64))).unwrap();
//! assert_eq!(value, Some(FieldValue::Text("79991234567".into())));
//!
//! let err = phone.validate(Some(&json!("89991234567"))).unwrap_err();
//! assert!(err.to_string().starts_with("phone: "));
//! ```

use std::sync::OnceLock;

use chrono::{Months, NaiveDate, Utc};
use regex::Regex;
use serde_json::Value;

use crate::error::ValidationError;
use crate::record::{FieldValue, Gender};

/// Wire format of date fields.
pub const DATE_FORMAT: &str = "%d.%m.%Y";

/// Oldest accepted age for birthday fields, in years.
pub const MAX_AGE_YEARS: u32 = 70;

/// Email addresses must be longer than this many characters.
const MIN_EMAIL_LENGTH: usize = 7;

const REQUIRED_ABSENT: &str = "required field absent";
const MUST_NOT_BE_NULL: &str = "field must not be null";

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^.+@(\[?)[a-zA-Z0-9\-.]+\.([a-zA-Z]{2,3}|[0-9]{1,3})(\]?)$")
            .expect("valid regex")
    })
}

fn phone_regex() -> &'static Regex {
    static PHONE: OnceLock<Regex> = OnceLock::new();
    PHONE.get_or_init(|| Regex::new(r"^7[0-9]{10}$").expect("valid regex"))
}

fn date_regex() -> &'static Regex {
    static DATE: OnceLock<Regex> = OnceLock::new();
    DATE.get_or_init(|| Regex::new(r"^[0-9]{1,2}\.[0-9]{1,2}\.[0-9]{4}$").expect("valid regex"))
}

/// Returns the current UTC calendar date, used by birthday checks.
#[must_use]
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// The type and conversion rules of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Any string.
    Char,
    /// A JSON object, kept as-is.
    Arguments,
    /// A string that looks like an email address.
    Email,
    /// An 11 digit phone number starting with `7`, as string or integer.
    Phone,
    /// A `DD.MM.YYYY` date.
    Date,
    /// A `DD.MM.YYYY` date no more than [`MAX_AGE_YEARS`] in the past.
    BirthDay,
    /// An integer gender code: 0, 1 or 2.
    Gender,
    /// A list of non-negative integer client ids.
    ClientIds,
}

impl FieldKind {
    /// Step 3: checks the JSON type of a present, non-null value.
    pub fn check_type(self, value: &Value) -> Result<(), &'static str> {
        let ok = match self {
            Self::Char | Self::Email | Self::Date | Self::BirthDay => value.is_string(),
            Self::Arguments => value.is_object(),
            Self::Phone => value.is_string() || is_integer(value),
            Self::Gender => is_integer(value),
            Self::ClientIds => {
                let Some(items) = value.as_array() else {
                    return Err("field must be list");
                };
                if !items.iter().all(is_integer) {
                    return Err("field must be list of numbers");
                }
                true
            }
        };

        if ok {
            Ok(())
        } else {
            Err(self.type_message())
        }
    }

    /// Step 4: applies the semantic rules and converts a value that passed
    /// [`check_type`](Self::check_type).
    pub fn convert(self, value: &Value, today: NaiveDate) -> Result<FieldValue, String> {
        match self {
            Self::Char => Ok(FieldValue::Text(as_text(value))),
            Self::Arguments => Ok(FieldValue::Object(
                value.as_object().cloned().unwrap_or_default(),
            )),
            Self::Email => {
                let email = as_text(value);
                if email.chars().count() > MIN_EMAIL_LENGTH && email_regex().is_match(&email) {
                    Ok(FieldValue::Text(email))
                } else {
                    Err("field must be valid email address".to_string())
                }
            }
            Self::Phone => {
                let phone = match value {
                    Value::Number(n) => n.to_string(),
                    other => as_text(other),
                };
                if phone_regex().is_match(&phone) {
                    Ok(FieldValue::Text(phone))
                } else {
                    Err("field must be valid phone (11 digits, leading digit = 7)".to_string())
                }
            }
            Self::Date => parse_date(value).map(FieldValue::Date),
            Self::BirthDay => {
                let date = parse_date(value)?;
                if within_age_limit(date, today) {
                    Ok(FieldValue::Date(date))
                } else {
                    Err("invalid birthday".to_string())
                }
            }
            Self::Gender => value
                .as_i64()
                .and_then(Gender::from_code)
                .map(FieldValue::Gender)
                .ok_or_else(|| "field must be 0, 1 or 2".to_string()),
            Self::ClientIds => value
                .as_array()
                .and_then(|items| items.iter().map(Value::as_u64).collect::<Option<Vec<_>>>())
                .map(FieldValue::ClientIds)
                .ok_or_else(|| "field must be list of non-negative numbers".to_string()),
        }
    }

    fn type_message(self) -> &'static str {
        match self {
            Self::Char | Self::Email | Self::Date | Self::BirthDay => "field must be string",
            Self::Arguments => "field must be object",
            Self::Phone => "field must be string or number",
            Self::Gender => "field must be number",
            Self::ClientIds => "field must be list",
        }
    }
}

/// A named value descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Field {
    name: &'static str,
    kind: FieldKind,
    required: bool,
    nullable: bool,
}

impl Field {
    /// Creates an optional, non-nullable field.
    #[must_use]
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
            nullable: false,
        }
    }

    /// Marks the field as required.
    #[must_use]
    pub const fn required(self) -> Self {
        Self {
            required: true,
            ..self
        }
    }

    /// Allows the field to be `null`.
    #[must_use]
    pub const fn nullable(self) -> Self {
        Self {
            nullable: true,
            ..self
        }
    }

    /// Returns the field name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the field kind.
    #[must_use]
    pub const fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Returns whether the field must be present.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.required
    }

    /// Returns whether the field may be `null`.
    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Validates and converts a raw value using today's date.
    ///
    /// `raw` is `None` when the key is missing from the input mapping.
    pub fn validate(&self, raw: Option<&Value>) -> Result<Option<FieldValue>, ValidationError> {
        self.validate_on(raw, today())
    }

    /// Validates and converts a raw value against a fixed `today`.
    pub fn validate_on(
        &self,
        raw: Option<&Value>,
        today: NaiveDate,
    ) -> Result<Option<FieldValue>, ValidationError> {
        let value = match raw {
            None if self.required => return Err(self.error(REQUIRED_ABSENT)),
            None => return Ok(None),
            Some(Value::Null) if !self.nullable => return Err(self.error(MUST_NOT_BE_NULL)),
            Some(Value::Null) => return Ok(None),
            Some(value) => value,
        };

        self.kind
            .check_type(value)
            .map_err(|reason| self.error(reason))?;

        self.kind
            .convert(value, today)
            .map(Some)
            .map_err(|reason| self.error(reason))
    }

    fn error(&self, reason: impl Into<String>) -> ValidationError {
        ValidationError::field(self.name, reason)
    }
}

fn is_integer(value: &Value) -> bool {
    value.is_i64() || value.is_u64()
}

fn as_text(value: &Value) -> String {
    value.as_str().map(ToString::to_string).unwrap_or_default()
}

fn parse_date(value: &Value) -> Result<NaiveDate, String> {
    let raw = value.as_str().unwrap_or_default();
    // chrono's %Y takes signed years of any width and skips leading spaces
    if !date_regex().is_match(raw) {
        return Err("invalid date format".to_string());
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|e| format!("invalid date format ({e})"))
}

/// A birthday is accepted when it is not earlier than the same calendar day
/// [`MAX_AGE_YEARS`] years ago.
fn within_age_limit(date: NaiveDate, today: NaiveDate) -> bool {
    today
        .checked_sub_months(Months::new(MAX_AGE_YEARS * 12))
        .map_or(true, |oldest| date >= oldest)
}
