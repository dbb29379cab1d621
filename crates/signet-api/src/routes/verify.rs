//! Inbound federation-auth verification.
//!
//! `POST /_matrix/custom/verify` checks an `Authorization: X-Matrix
//! origin="…",key="…",sig="…"` header against the claimed origin's
//! currently-resolved keys. The signed object is reassembled from the
//! `X-Keys-Method` / `X-Keys-URI` / `X-Keys-Destination` headers plus the
//! optional JSON body:
//!
//! ```json
//! {
//!   "method":      "GET",
//!   "uri":         "/_matrix/federation/v1/...",
//!   "origin":      "origin.server",
//!   "destination": "this.server",
//!   "content":     { ... }
//! }
//! ```

use axum::{
    extract::State,
    http::{header, HeaderMap},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use signet_common::{ApiError, ApiResult};
use signet_signing::keypair::decode_verifying_key;
use signet_signing::{verify_signatures, PublicKeyMap};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, warn};

use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/_matrix/custom/verify", post(verify_auth))
}

struct XMatrixAuth {
    origin: String,
    key_id: String,
    signature: String,
}

/// Parse an `X-Matrix` Authorization header value into its parts.
fn parse_x_matrix(header: &str) -> Option<XMatrixAuth> {
    let params = header.strip_prefix("X-Matrix ")?;

    let mut origin = None;
    let mut key_id = None;
    let mut signature = None;
    for part in params.split(',') {
        let (k, v) = part.trim().split_once('=')?;
        let v = v.trim_matches('"');
        match k {
            "origin" => origin = Some(v.to_owned()),
            "key" => key_id = Some(v.to_owned()),
            "sig" => signature = Some(v.to_owned()),
            _ => {}
        }
    }

    Some(XMatrixAuth { origin: origin?, key_id: key_id?, signature: signature? })
}

fn header_str<'h>(headers: &'h HeaderMap, name: &str) -> &'h str {
    headers.get(name).and_then(|v| v.to_str().ok()).unwrap_or("")
}

async fn verify_auth(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> ApiResult<Json<Value>> {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;
    let auth = parse_x_matrix(auth).ok_or(ApiError::Unauthorized)?;

    let mut obj = json!({
        "method": header_str(&headers, "x-keys-method"),
        "uri": header_str(&headers, "x-keys-uri"),
        "origin": auth.origin.clone(),
        "destination": header_str(&headers, "x-keys-destination"),
        "signatures": {
            auth.origin.clone(): { auth.key_id.clone(): auth.signature.clone() }
        }
    });
    if !body.is_empty() {
        match serde_json::from_str::<Value>(&body) {
            Ok(content) => {
                obj["content"] = content;
            }
            Err(e) => warn!("Ignoring unparsable request body: {e}"),
        }
    }

    let remote = state.key_resolver.query(&auth.origin, 0).await.map_err(|e| {
        error!("Failed to resolve keys for {}: {e}", auth.origin);
        ApiError::Internal("Failed to get remote server keys".into())
    })?;

    let mut public_keys: PublicKeyMap = HashMap::new();
    let domain = public_keys.entry(remote.server.server_name.clone()).or_default();
    for key in &remote.keys {
        let vk = decode_verifying_key(&key.public_key_b64).map_err(|e| {
            error!("Bad cached public key {} for {}: {e}", key.key_id, key.server_name);
            ApiError::Internal("Failed to parse remote server keys".into())
        })?;
        domain.insert(key.key_id.clone(), vk);
    }

    match verify_signatures(&obj, &public_keys) {
        Ok(()) => Ok(Json(json!({}))),
        Err(e) => {
            warn!("Request signature from {} rejected: {e}", auth.origin);
            Err(ApiError::Unauthorized)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::parse_x_matrix;

    #[test]
    fn parses_quoted_params() {
        let auth = parse_x_matrix(
            r#"X-Matrix origin="origin.server",key="ed25519:abc",sig="c2lnbmF0dXJl""#,
        )
        .unwrap();
        assert_eq!(auth.origin, "origin.server");
        assert_eq!(auth.key_id, "ed25519:abc");
        assert_eq!(auth.signature, "c2lnbmF0dXJl");
    }

    #[test]
    fn parses_unquoted_params() {
        let auth =
            parse_x_matrix("X-Matrix origin=origin.server,key=ed25519:abc,sig=c2ln").unwrap();
        assert_eq!(auth.origin, "origin.server");
    }

    #[test]
    fn rejects_other_schemes() {
        assert!(parse_x_matrix("Bearer abcdef").is_none());
    }

    #[test]
    fn rejects_missing_fields() {
        assert!(parse_x_matrix("X-Matrix origin=\"a\",key=\"b\"").is_none());
    }
}
