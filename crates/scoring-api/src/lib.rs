//! # Scoring API
//!
//! Authenticated method dispatch for the scoring service.
//!
//! A call body is validated against the envelope schema, authenticated,
//! routed by method name, validated against the method's own schema and only
//! then handed to the handler:
//!
//! - [`MethodRouter`] - Routes method names to schemas and handlers
//! - [`Outcome`] - The result of one dispatched call and its response envelope
//! - [`auth::Credentials`] - Token checks for regular and admin callers
//! - [`Store`] / [`MemoryStore`] - Key/value store behind the scoring functions
//! - [`handlers`] - The `online_score` and `clients_interests` methods
//!
//! # Example
//!
//! ```
//! use scoring_api::{auth::Credentials, default_router, MemoryStore};
//! use scoring_core::RequestContext;
//! use serde_json::json;
//!
//! let credentials = Credentials::default();
//! let router = default_router(credentials.clone());
//! let store = MemoryStore::new();
//!
//! let body = json!({
//!     "account": "horns&hoofs",
//!     "login": "h&f",
//!     "token": credentials.user_token("horns&hoofs", "h&f"),
//!     "method": "online_score",
//!     "arguments": {"phone": "79175002040", "email": "stupnikov@otus.ru"},
//! });
//!
//! let mut ctx = RequestContext::new();
//! let outcome = router.dispatch(body.as_object().unwrap(), &mut ctx, &store);
//! assert_eq!(outcome.into_envelope(), json!({"response": {"score": 3.0}, "code": 200}));
//! assert_eq!(ctx.has(), ["email".to_string(), "phone".to_string()]);
//! ```

#![doc(html_root_url = "https://docs.rs/scoring-api/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod auth;
pub mod dispatcher;
mod error;
pub mod handlers;
pub mod schemas;
pub mod scoring;
mod store;

pub use dispatcher::{error_text, MethodHandler, MethodRouter, Outcome};
pub use error::{HandlerError, StoreError, StoreResult};
pub use handlers::default_router;
pub use store::{MemoryStore, Store};
