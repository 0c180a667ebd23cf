//! # Scoring Core
//!
//! Declarative request validation for the scoring API.
//!
//! This crate provides the building blocks every request shape is made of:
//!
//! - [`Field`] / [`FieldKind`] - Named value descriptors with type and semantic checks
//! - [`Schema`] / [`CrossFieldRule`] - Ordered field sets plus record-level rules
//! - [`Record`] / [`FieldValue`] - Validated, converted values
//! - [`ValidationError`] / [`ErrorReport`] - Ordered validation failures
//! - [`RequestContext`] / [`RequestId`] - Per-request state for handlers and logs
//!
//! # Example
//!
//! ```
//! use scoring_core::{Field, FieldKind, Schema};
//! use serde_json::json;
//!
//! static FIELDS: [Field; 2] = [
//!     Field::new("phone", FieldKind::Phone).nullable(),
//!     Field::new("gender", FieldKind::Gender).nullable(),
//! ];
//! static SCHEMA: Schema = Schema::new("contact", &FIELDS);
//!
//! let raw = json!({"phone": "79175002040", "gender": 5});
//! let report = SCHEMA.validate(raw.as_object().unwrap()).unwrap_err();
//! assert_eq!(report.joined(), "gender: field must be 0, 1 or 2");
//! ```

#![doc(html_root_url = "https://docs.rs/scoring-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod error;
pub mod field;
mod record;
pub mod schema;

pub use context::{RequestContext, RequestId};
pub use error::{ErrorReport, ValidationError, MESSAGE_SEPARATOR};
pub use field::{today, Field, FieldKind, DATE_FORMAT, MAX_AGE_YEARS};
pub use record::{FieldValue, Gender, Record};
pub use schema::{CrossFieldRule, Schema};
