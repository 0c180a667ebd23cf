//! Score and interest lookups.

use std::time::Duration;

use scoring_core::Gender;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{StoreError, StoreResult};
use crate::schemas::OnlineScoreRequest;
use crate::store::Store;

/// How long a computed score stays cached.
pub const SCORE_TTL: Duration = Duration::from_secs(60 * 60);

/// Cache key of a score: `uid:` followed by a digest of the caller's
/// names, phone and birthday.
#[must_use]
pub fn score_key(request: &OnlineScoreRequest) -> String {
    let birthday = request
        .birthday
        .map(|date| date.format("%Y%m%d").to_string())
        .unwrap_or_default();
    let parts = [
        request.first_name.as_deref().unwrap_or_default(),
        request.last_name.as_deref().unwrap_or_default(),
        request.phone.as_deref().unwrap_or_default(),
        birthday.as_str(),
    ];
    format!("uid:{}", hex::encode(Sha256::digest(parts.concat().as_bytes())))
}

/// Returns the caller's score, from cache when possible.
///
/// A cached positive score wins. Otherwise the score is computed from which
/// arguments are filled in and cached for [`SCORE_TTL`].
pub fn get_score(store: &dyn Store, request: &OnlineScoreRequest) -> f64 {
    let key = score_key(request);
    if let Some(cached) = store
        .cache_get(&key)
        .and_then(|raw| raw.parse::<f64>().ok())
        .filter(|score| *score > 0.0)
    {
        tracing::debug!(%key, score = cached, "score cache hit");
        return cached;
    }

    let filled = |value: &Option<String>| value.as_deref().is_some_and(|s| !s.is_empty());
    let mut score = 0.0;
    if filled(&request.phone) {
        score += 1.5;
    }
    if filled(&request.email) {
        score += 1.5;
    }
    if request.birthday.is_some() && request.gender.is_some_and(|g| g != Gender::Unknown) {
        score += 1.5;
    }
    if filled(&request.first_name) && filled(&request.last_name) {
        score += 0.5;
    }

    store.cache_set(&key, &score.to_string(), SCORE_TTL);
    score
}

/// Returns a client's interests, or an empty list when none are stored.
pub fn get_interests(store: &dyn Store, client_id: u64) -> StoreResult<Vec<String>> {
    let key = format!("i:{client_id}");
    let Some(raw) = store.get(&key)? else {
        return Ok(Vec::new());
    };

    let value: Value =
        serde_json::from_str(&raw).map_err(|e| StoreError::malformed(&key, e.to_string()))?;
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                other => Err(StoreError::malformed(
                    &key,
                    format!("expected a string, got {other}"),
                )),
            })
            .collect(),
        _ => Err(StoreError::malformed(&key, "expected a list")),
    }
}
