use std::time::Duration;

use reqwest::header::HeaderMap;
use serde_json::Value;
use tracing::{error, warn};

use crate::error::{CrawlerError, CrawlerResult};
use crate::http::HttpSession;

/// Fetches `url` and returns the JSON array found at `records_pointer`.
///
/// Every failure is logged and degrades to an empty list: transport and
/// decoding failures at error level, a missing or wrong-typed array at
/// warning level together with the keys the response did contain.
pub async fn fetch(
    session: &HttpSession,
    url: &str,
    params: Option<&[(&str, &str)]>,
    headers: &HeaderMap,
    timeout: Duration,
    records_pointer: &str,
) -> Vec<Value> {
    match try_fetch(session, url, params, headers, timeout, records_pointer).await {
        Ok(records) => records,
        Err(e @ CrawlerError::Schema { .. }) => {
            warn!("Unusable response from {}: {}", url, e);
            Vec::new()
        }
        Err(e @ CrawlerError::Decode(_)) => {
            error!("Failed to parse JSON from {}: {}", url, e);
            Vec::new()
        }
        Err(e) => {
            error!("Request to {} failed: {}", url, e);
            Vec::new()
        }
    }
}

pub async fn try_fetch(
    session: &HttpSession,
    url: &str,
    params: Option<&[(&str, &str)]>,
    headers: &HeaderMap,
    timeout: Duration,
    records_pointer: &str,
) -> CrawlerResult<Vec<Value>> {
    let response = session
        .get(url, params, headers, timeout)
        .await?
        .error_for_status()?;
    let body = response.bytes().await?;
    let json: Value = serde_json::from_slice(&body)?;
    take_records(json, records_pointer)
}

/// Moves the array at `pointer` (RFC 6901) out of `body`.
pub fn take_records(mut body: Value, pointer: &str) -> CrawlerResult<Vec<Value>> {
    let keys = top_level_keys(&body);
    match body.pointer_mut(pointer) {
        Some(Value::Array(items)) => Ok(std::mem::take(items)),
        _ => Err(CrawlerError::Schema {
            field: pointer.trim_start_matches('/').replace('/', "."),
            keys,
        }),
    }
}

fn top_level_keys(body: &Value) -> Vec<String> {
    body.as_object()
        .map(|map| map.keys().cloned().collect())
        .unwrap_or_default()
}
