//! Method dispatch.
//!
//! A call goes through these states, stopping at the first failure:
//!
//! ```text
//! envelope validation ─► authentication ─► method lookup ─► payload validation ─► handler
//!        │                     │                 │                  │                │
//!   EnvelopeInvalid        Forbidden       UnknownMethod      PayloadInvalid   Succeeded / HandlerError
//! ```
//!
//! The handler only runs once every earlier step passed.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use http::StatusCode;
use scoring_core::{ErrorReport, Record, RequestContext, Schema};
use serde_json::{json, Map, Value};

use crate::auth::Credentials;
use crate::error::HandlerError;
use crate::schemas::{MethodRequest, METHOD_REQUEST};
use crate::store::Store;

/// A method handler: `(context, store, envelope, payload) -> result`.
pub type MethodHandler = dyn Fn(&mut RequestContext, &dyn Store, &MethodRequest, &Record) -> Result<Value, HandlerError>
    + Send
    + Sync;

#[derive(Clone)]
struct Route {
    schema: &'static Schema,
    handler: Arc<MethodHandler>,
}

/// The result of one dispatched call.
#[derive(Debug)]
pub enum Outcome {
    /// The envelope failed validation.
    EnvelopeInvalid(ErrorReport),
    /// The token did not match.
    Forbidden,
    /// No handler is registered under the method name.
    UnknownMethod(String),
    /// The method arguments failed validation.
    PayloadInvalid(ErrorReport),
    /// The handler returned a value.
    Succeeded(Value),
    /// The handler failed or panicked.
    HandlerError(HandlerError),
}

impl Outcome {
    /// HTTP status code of the outcome.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::EnvelopeInvalid(_) | Self::PayloadInvalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::UnknownMethod(_) => StatusCode::NOT_FOUND,
            Self::Succeeded(_) => StatusCode::OK,
            Self::HandlerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns `true` for [`Outcome::Succeeded`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    /// Builds the response envelope.
    ///
    /// Success is `{"response": <value>, "code": 200}`; anything else is
    /// `{"error": <message>, "code": <status>}`. Handler failures never leak
    /// their cause.
    #[must_use]
    pub fn into_envelope(self) -> Value {
        let code = self.status_code();
        let message = match self {
            Self::Succeeded(response) => {
                return json!({"response": response, "code": code.as_u16()});
            }
            Self::EnvelopeInvalid(report) | Self::PayloadInvalid(report) => report.joined(),
            Self::UnknownMethod(method) => format!("unknown method: {method}"),
            Self::Forbidden | Self::HandlerError(_) => error_text(code).to_string(),
        };
        json!({"error": message, "code": code.as_u16()})
    }
}

/// Generic text for an error status.
#[must_use]
pub fn error_text(code: StatusCode) -> &'static str {
    match code {
        StatusCode::BAD_REQUEST => "Bad Request",
        StatusCode::FORBIDDEN => "Forbidden",
        StatusCode::NOT_FOUND => "Not Found",
        StatusCode::UNPROCESSABLE_ENTITY => "Invalid Request",
        StatusCode::INTERNAL_SERVER_ERROR => "Internal Server Error",
        _ => "Unknown Error",
    }
}

/// Routes method names to their argument schema and handler.
///
/// # Example
///
/// ```
/// use scoring_api::{auth::Credentials, MemoryStore, MethodRouter, Outcome};
/// use scoring_api::schemas::CLIENTS_INTERESTS;
/// use scoring_core::RequestContext;
/// use serde_json::json;
///
/// let credentials = Credentials::default();
/// let router = MethodRouter::new(credentials.clone()).register(
///     "count",
///     &CLIENTS_INTERESTS,
///     |_ctx, _store, _request, payload| {
///         Ok(json!(payload.client_ids("client_ids").map_or(0, <[u64]>::len)))
///     },
/// );
///
/// let body = json!({
///     "login": "h&f",
///     "token": credentials.user_token("", "h&f"),
///     "method": "count",
///     "arguments": {"client_ids": [1, 2]},
/// });
/// let mut ctx = RequestContext::new();
/// let outcome = router.dispatch(body.as_object().unwrap(), &mut ctx, &MemoryStore::new());
/// assert_eq!(outcome.into_envelope(), json!({"response": 2, "code": 200}));
/// ```
#[derive(Clone)]
pub struct MethodRouter {
    credentials: Credentials,
    routes: HashMap<String, Route>,
}

impl MethodRouter {
    /// Creates a router with no methods.
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            routes: HashMap::new(),
        }
    }

    /// Registers a method.
    ///
    /// # Panics
    ///
    /// Panics if `schema` declares a field name twice.
    #[must_use]
    pub fn register<F>(mut self, method: impl Into<String>, schema: &'static Schema, handler: F) -> Self
    where
        F: Fn(&mut RequestContext, &dyn Store, &MethodRequest, &Record) -> Result<Value, HandlerError>
            + Send
            + Sync
            + 'static,
    {
        if let Some(field) = schema.duplicate_field() {
            panic!("schema '{}' declares field '{}' twice", schema.name(), field);
        }
        self.routes.insert(
            method.into(),
            Route {
                schema,
                handler: Arc::new(handler),
            },
        );
        self
    }

    /// Returns the credentials used for authentication.
    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Returns `true` if a handler is registered under `method`.
    #[must_use]
    pub fn has_method(&self, method: &str) -> bool {
        self.routes.contains_key(method)
    }

    /// Returns the registered method names, sorted.
    #[must_use]
    pub fn methods(&self) -> Vec<&str> {
        let mut methods: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        methods.sort_unstable();
        methods
    }

    /// Dispatches one call body at the current time.
    pub fn dispatch(
        &self,
        body: &Map<String, Value>,
        ctx: &mut RequestContext,
        store: &dyn Store,
    ) -> Outcome {
        self.dispatch_at(body, ctx, store, Utc::now())
    }

    /// Dispatches one call body, authenticating against `now`.
    pub fn dispatch_at(
        &self,
        body: &Map<String, Value>,
        ctx: &mut RequestContext,
        store: &dyn Store,
        now: DateTime<Utc>,
    ) -> Outcome {
        let request_id = ctx.request_id().clone();

        let envelope = match METHOD_REQUEST.validate_on(body, now.date_naive()) {
            Ok(record) => MethodRequest::from_record(&record, self.credentials.admin_login()),
            Err(report) => {
                tracing::debug!(%request_id, errors = report.len(), "envelope invalid");
                return Outcome::EnvelopeInvalid(report);
            }
        };
        ctx.set_method(envelope.method.clone());

        if !self.credentials.is_authenticated_at(&envelope, now) {
            tracing::debug!(%request_id, login = ?envelope.login, "authentication failed");
            return Outcome::Forbidden;
        }

        let Some(route) = self.routes.get(&envelope.method) else {
            tracing::debug!(%request_id, method = %envelope.method, "unknown method");
            return Outcome::UnknownMethod(envelope.method);
        };

        let payload = match route.schema.validate_on(&envelope.arguments, now.date_naive()) {
            Ok(record) => record,
            Err(report) => {
                tracing::debug!(%request_id, method = %envelope.method, errors = report.len(), "payload invalid");
                return Outcome::PayloadInvalid(report);
            }
        };

        tracing::debug!(%request_id, method = %envelope.method, admin = envelope.is_admin(), "executing");
        let result = catch_unwind(AssertUnwindSafe(|| {
            (route.handler)(ctx, store, &envelope, &payload)
        }));

        match result {
            Ok(Ok(response)) => Outcome::Succeeded(response),
            Ok(Err(error)) => {
                tracing::error!(%request_id, method = %envelope.method, %error, "handler failed");
                Outcome::HandlerError(error)
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(%request_id, method = %envelope.method, %message, "handler panicked");
                Outcome::HandlerError(HandlerError::Panicked { message })
            }
        }
    }
}

impl std::fmt::Debug for MethodRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodRouter")
            .field("methods", &self.methods())
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::CLIENTS_INTERESTS;
    use crate::store::MemoryStore;
    use crate::error::StoreError;

    fn router() -> MethodRouter {
        MethodRouter::new(Credentials::default())
            .register("echo", &CLIENTS_INTERESTS, |ctx, _store, _request, payload| {
                let ids = payload.client_ids("client_ids").unwrap_or_default();
                ctx.set_nclients(ids.len());
                Ok(json!(ids))
            })
            .register("broken", &CLIENTS_INTERESTS, |_ctx, _store, _request, _payload| {
                Err(StoreError::unavailable("down").into())
            })
            .register("panics", &CLIENTS_INTERESTS, |_ctx, _store, _request, _payload| {
                panic!("boom")
            })
    }

    fn call(method: &str, arguments: Value) -> Map<String, Value> {
        let token = Credentials::default().user_token("acc", "user");
        json!({
            "account": "acc",
            "login": "user",
            "token": token,
            "method": method,
            "arguments": arguments,
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    fn run(body: &Map<String, Value>) -> (Outcome, RequestContext) {
        let mut ctx = RequestContext::new();
        let outcome = router().dispatch(body, &mut ctx, &MemoryStore::new());
        (outcome, ctx)
    }

    #[test]
    fn test_success() {
        let (outcome, ctx) = run(&call("echo", json!({"client_ids": [4, 5]})));
        assert_eq!(outcome.status_code(), StatusCode::OK);
        assert_eq!(ctx.nclients(), Some(2));
        assert_eq!(ctx.method(), Some("echo"));
        assert_eq!(outcome.into_envelope(), json!({"response": [4, 5], "code": 200}));
    }

    #[test]
    fn test_envelope_invalid() {
        let (outcome, ctx) = run(&Map::new());
        assert!(matches!(outcome, Outcome::EnvelopeInvalid(_)));
        assert_eq!(ctx.method(), None);
        assert_eq!(outcome.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_forbidden_before_lookup() {
        let mut body = call("nope", json!({}));
        body.insert("token".into(), json!("bad"));
        let (outcome, _) = run(&body);
        assert_eq!(
            outcome.into_envelope(),
            json!({"error": "Forbidden", "code": 403})
        );
    }

    #[test]
    fn test_unknown_method() {
        let (outcome, _) = run(&call("nope", json!({})));
        assert_eq!(
            outcome.into_envelope(),
            json!({"error": "unknown method: nope", "code": 404})
        );
    }

    #[test]
    fn test_payload_invalid() {
        let (outcome, ctx) = run(&call("echo", json!({"client_ids": []})));
        assert_eq!(ctx.nclients(), None);
        assert_eq!(
            outcome.into_envelope(),
            json!({"error": "empty client list", "code": 422})
        );
    }

    #[test]
    fn test_null_arguments_validate_as_empty() {
        let (outcome, _) = run(&call("echo", Value::Null));
        assert_eq!(
            outcome.into_envelope(),
            json!({"error": "client_ids: required field absent", "code": 422})
        );
    }

    #[test]
    fn test_handler_error_is_opaque() {
        let (outcome, _) = run(&call("broken", json!({"client_ids": [1]})));
        assert!(matches!(outcome, Outcome::HandlerError(HandlerError::Store(_))));
        assert_eq!(
            outcome.into_envelope(),
            json!({"error": "Internal Server Error", "code": 500})
        );
    }

    #[test]
    fn test_handler_panic_is_contained() {
        let (outcome, _) = run(&call("panics", json!({"client_ids": [1]})));
        match outcome {
            Outcome::HandlerError(HandlerError::Panicked { message }) => assert_eq!(message, "boom"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_router_introspection() {
        let router = router();
        assert_eq!(router.methods(), vec!["broken", "echo", "panics"]);
        assert!(router.has_method("echo"));
        assert!(!router.has_method("online_score"));
    }

    #[test]
    #[should_panic(expected = "declares field 'a' twice")]
    fn test_register_rejects_duplicate_fields() {
        use scoring_core::{Field, FieldKind};
        static FIELDS: [Field; 2] = [
            Field::new("a", FieldKind::Char),
            Field::new("a", FieldKind::Char),
        ];
        static DUPLICATED: Schema = Schema::new("dup", &FIELDS);
        let _ = MethodRouter::new(Credentials::default())
            .register("dup", &DUPLICATED, |_, _, _, _| Ok(Value::Null));
    }

    #[test]
    fn test_error_text_table() {
        assert_eq!(error_text(StatusCode::BAD_REQUEST), "Bad Request");
        assert_eq!(error_text(StatusCode::NOT_FOUND), "Not Found");
        assert_eq!(error_text(StatusCode::UNPROCESSABLE_ENTITY), "Invalid Request");
        assert_eq!(error_text(StatusCode::IM_A_TEAPOT), "Unknown Error");
    }
}
