//! Request context types.
//!
//! The [`RequestContext`] carries per-request state from the transport into
//! method handlers, and back out again for access logging.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Identifier of one request, used for log correlation.
///
/// Clients may supply their own id in the `X-Request-ID` header; otherwise a
/// time-ordered UUID v7 is generated.
///
/// # Example
///
/// ```
/// use scoring_core::RequestId;
///
/// let id = RequestId::new();
/// assert_eq!(id.as_str().len(), 32);
///
/// let id = RequestId::from_header(Some("abc-123"));
/// assert_eq!(id.to_string(), "abc-123");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Creates a new request id from a UUID v7, rendered as 32 hex digits.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().simple().to_string())
    }

    /// Uses the header value when present and non-blank, otherwise generates
    /// a fresh id.
    #[must_use]
    pub fn from_header(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(id) if !id.is_empty() => Self(id.to_string()),
            _ => Self::new(),
        }
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid.simple().to_string())
    }
}

/// Per-request context that handlers may annotate.
///
/// Besides the request id and timing, handlers record what they saw:
/// - `has`: the argument fields of an `online_score` call that held a value
/// - `nclients`: the number of client ids of a `clients_interests` call
///
/// # Example
///
/// ```
/// use scoring_core::RequestContext;
///
/// let mut ctx = RequestContext::new();
/// ctx.set_nclients(3);
/// assert_eq!(ctx.nclients(), Some(3));
/// assert!(ctx.has().is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: RequestId,
    method: Option<String>,
    has: Vec<String>,
    nclients: Option<usize>,
    started_at: Instant,
}

impl RequestContext {
    /// Creates an empty context with a fresh request id.
    #[must_use]
    pub fn new() -> Self {
        Self::with_request_id(RequestId::new())
    }

    /// Creates an empty context with the given request id.
    #[must_use]
    pub fn with_request_id(request_id: RequestId) -> Self {
        Self {
            request_id,
            method: None,
            has: Vec::new(),
            nclients: None,
            started_at: Instant::now(),
        }
    }

    /// Returns the request id.
    #[must_use]
    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    /// Returns the dispatched method name, once the envelope was accepted.
    #[must_use]
    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    /// Records the dispatched method name.
    pub fn set_method(&mut self, method: impl Into<String>) {
        self.method = Some(method.into());
    }

    /// Returns the names of the non-null score arguments.
    #[must_use]
    pub fn has(&self) -> &[String] {
        &self.has
    }

    /// Records the names of the non-null score arguments.
    pub fn set_has<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.has = fields.into_iter().map(Into::into).collect();
    }

    /// Returns the number of clients asked about, if recorded.
    #[must_use]
    pub fn nclients(&self) -> Option<usize> {
        self.nclients
    }

    /// Records the number of clients asked about.
    pub fn set_nclients(&mut self, nclients: usize) {
        self.nclients = Some(nclients);
    }

    /// Returns the time elapsed since the context was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_uniqueness() {
        let id1 = RequestId::new();
        let id2 = RequestId::new();
        assert_ne!(id1, id2);
        assert!(id1.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_request_id_from_header() {
        assert_eq!(RequestId::from_header(Some(" req-1 ")).as_str(), "req-1");
        assert_eq!(RequestId::from_header(Some("  ")).as_str().len(), 32);
        assert_eq!(RequestId::from_header(None).as_str().len(), 32);
    }

    #[test]
    fn test_request_id_from_uuid() {
        let uuid = Uuid::now_v7();
        assert_eq!(RequestId::from(uuid).to_string(), uuid.simple().to_string());
    }

    #[test]
    fn test_context_annotations() {
        let mut ctx = RequestContext::with_request_id(RequestId::from_header(Some("r")));
        assert_eq!(ctx.request_id().as_str(), "r");
        assert_eq!(ctx.method(), None);
        assert_eq!(ctx.nclients(), None);

        ctx.set_method("online_score");
        ctx.set_has(["phone", "email"]);
        ctx.set_nclients(2);

        assert_eq!(ctx.method(), Some("online_score"));
        assert_eq!(ctx.has(), ["phone".to_string(), "email".to_string()]);
        assert_eq!(ctx.nclients(), Some(2));
    }

    #[test]
    fn test_context_elapsed() {
        let ctx = RequestContext::new();
        std::thread::sleep(Duration::from_millis(5));
        assert!(ctx.elapsed() >= Duration::from_millis(5));
    }
}
