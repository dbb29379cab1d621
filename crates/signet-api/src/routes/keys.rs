//! This server's own key document.
//!
//! `GET /_matrix/key/v2/server[/{key_id}]` — the `key_id` path segment is
//! accepted for compatibility and ignored; the full document is always
//! served. The document is signed by every key this server has ever used,
//! so responses stay verifiable against retired keys too.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde_json::{Map, Value};
use signet_common::time::now_millis;
use signet_common::{ApiError, ApiResult};
use signet_db::repository::own_keys;
use signet_signing::{signature_of_object, SigningKeyPair};
use std::sync::Arc;
use tracing::error;

use crate::AppState;

/// How long a served key document remains valid (24 hours).
const DOCUMENT_LIFETIME_MS: i64 = 86_400_000;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/_matrix/key/v2/server", get(local_keys))
        .route("/_matrix/key/v2/server/{key_id}", get(local_keys_by_id))
}

async fn local_keys(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    serve_local_keys(&state).await.map(Json)
}

async fn local_keys_by_id(
    State(state): State<Arc<AppState>>,
    Path(_key_id): Path<String>,
) -> ApiResult<Json<Value>> {
    serve_local_keys(&state).await.map(Json)
}

async fn serve_local_keys(state: &AppState) -> ApiResult<Value> {
    let own = own_keys::all(&state.db.pg).await.map_err(|e| {
        error!("Failed to load own keys: {e}");
        ApiError::Internal("Failed to get keys".into())
    })?;

    let mut verify_keys = Map::new();
    let mut old_verify_keys = Map::new();
    for key in &own {
        if key.expires_ts > 0 {
            old_verify_keys.insert(
                key.key_id.clone(),
                serde_json::json!({ "key": key.public_key_b64, "expired_ts": key.expires_ts }),
            );
        } else {
            verify_keys.insert(
                key.key_id.clone(),
                serde_json::json!({ "key": key.public_key_b64 }),
            );
        }
    }

    let mut response = Map::new();
    response.insert("server_name".to_owned(), Value::String(state.server_name.clone()));
    response.insert(
        "valid_until_ts".to_owned(),
        Value::Number((now_millis() + DOCUMENT_LIFETIME_MS).into()),
    );
    response.insert("verify_keys".to_owned(), Value::Object(verify_keys));
    response.insert("old_verify_keys".to_owned(), Value::Object(old_verify_keys));

    let mut domain_sigs = Map::new();
    for key in &own {
        let kp = SigningKeyPair::from_base64_seed(key.key_id.clone(), &key.private_key_b64)
            .map_err(|e| {
                error!("Failed to load private key {}: {e}", key.key_id);
                ApiError::Internal("Failed to load private key".into())
            })?;
        let signature =
            signature_of_object(&Value::Object(response.clone()), &kp).map_err(|e| {
                error!("Failed to sign key document: {e}");
                ApiError::Internal("Failed to sign response".into())
            })?;
        domain_sigs.insert(kp.key_id.clone(), Value::String(signature));
    }

    let mut signatures = Map::new();
    signatures.insert(state.server_name.clone(), Value::Object(domain_sigs));
    response.insert("signatures".to_owned(), Value::Object(signatures));

    Ok(Value::Object(response))
}
