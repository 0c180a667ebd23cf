//! The built-in API methods.

use scoring_core::{Record, RequestContext};
use serde_json::{json, Map, Value};

use crate::auth::Credentials;
use crate::dispatcher::MethodRouter;
use crate::error::HandlerError;
use crate::schemas::{
    ClientsInterestsRequest, MethodRequest, OnlineScoreRequest, CLIENTS_INTERESTS, ONLINE_SCORE,
};
use crate::scoring;
use crate::store::Store;

/// Score every administrator gets.
pub const ADMIN_SCORE: u32 = 42;

/// `online_score`: returns `{"score": <number>}`.
///
/// Records the names of the non-null arguments in the context.
pub fn online_score(
    ctx: &mut RequestContext,
    store: &dyn Store,
    request: &MethodRequest,
    payload: &Record,
) -> Result<Value, HandlerError> {
    ctx.set_has(payload.present_fields());

    if request.is_admin() {
        return Ok(json!({"score": ADMIN_SCORE}));
    }

    let arguments = OnlineScoreRequest::from_record(payload);
    let score = scoring::get_score(store, &arguments);
    Ok(json!({"score": score}))
}

/// `clients_interests`: returns a mapping of client id to interest list.
///
/// Records the number of clients in the context.
pub fn clients_interests(
    ctx: &mut RequestContext,
    store: &dyn Store,
    _request: &MethodRequest,
    payload: &Record,
) -> Result<Value, HandlerError> {
    let arguments = ClientsInterestsRequest::from_record(payload);
    ctx.set_nclients(arguments.nclients());

    let mut interests = Map::new();
    for client_id in &arguments.client_ids {
        let list = scoring::get_interests(store, *client_id)?;
        interests.insert(client_id.to_string(), serde_json::to_value(list)?);
    }
    Ok(Value::Object(interests))
}

/// A router with `online_score` and `clients_interests` registered.
#[must_use]
pub fn default_router(credentials: Credentials) -> MethodRouter {
    MethodRouter::new(credentials)
        .register("online_score", &ONLINE_SCORE, online_score)
        .register("clients_interests", &CLIENTS_INTERESTS, clients_interests)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_default_router_methods() {
        let router = default_router(Credentials::default());
        assert_eq!(router.methods(), vec!["clients_interests", "online_score"]);
    }

    #[test]
    fn test_interests_per_client() {
        let store = MemoryStore::new();
        store.insert("i:3", r#"["travel"]"#);

        let record = CLIENTS_INTERESTS
            .validate(json!({"client_ids": [3, 1]}).as_object().unwrap())
            .unwrap();
        let envelope = MethodRequest::from_record(
            &crate::schemas::METHOD_REQUEST
                .validate(
                    json!({"login": "u", "token": "t", "arguments": {}, "method": "clients_interests"})
                        .as_object()
                        .unwrap(),
                )
                .unwrap(),
            "admin",
        );

        let mut ctx = RequestContext::new();
        let value = clients_interests(&mut ctx, &store, &envelope, &record).unwrap();

        assert_eq!(ctx.nclients(), Some(2));
        assert_eq!(value, json!({"3": ["travel"], "1": []}));
    }
}
