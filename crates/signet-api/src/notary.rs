//! Notarized key responses.
//!
//! The notary re-serves a remote server's key document after verifying it:
//! the cached rows are expanded back into the wire shape, any non-standard
//! fields the peer originally sent are merged in verbatim, the object is
//! signed by every one of this server's keys, the peer's stored signatures
//! are appended, and the finished object is verified one last time before it
//! leaves the building. That final check must never fail under correct
//! logic; if it does, the request fails rather than shipping output we
//! cannot ourselves verify.

use serde_json::{Map, Value};
use signet_common::{ApiError, ApiResult};
use signet_db::repository::own_keys;
use signet_signing::keypair::decode_verifying_key;
use signet_signing::{signature_of_object, verify_signatures, PublicKeyMap, SigningKeyPair};
use std::collections::HashMap;
use tracing::{error, warn};

use crate::AppState;

/// Resolve `server_name`'s keys and assemble the doubly-signed notary
/// response. A peer that yielded no keys at all produces an empty object.
pub async fn find_and_prepare_keys(
    state: &AppState,
    server_name: &str,
    min_valid_until_ts: i64,
) -> ApiResult<Map<String, Value>> {
    let remote = state
        .key_resolver
        .query(server_name, min_valid_until_ts)
        .await
        .map_err(|e| {
            error!("Key resolution for {server_name} failed: {e}");
            ApiError::Internal("Fatal error retrieving keys".into())
        })?;

    if remote.keys.is_empty() {
        warn!("Did not get any keys for {server_name}");
        return Ok(Map::new());
    }

    if remote.server.server_name != server_name {
        error!(
            "Got keys for unexpected server: asked {server_name}, got {}",
            remote.server.server_name
        );
        return Err(ApiError::Internal("Unexpected server_name".into()));
    }

    let mut public_keys: PublicKeyMap = HashMap::new();
    public_keys.entry(state.server_name.clone()).or_default();
    public_keys.entry(server_name.to_owned()).or_default();

    // Expand the cached rows back into the wire shape. Only active keys
    // participate in verification; retired ones are served informationally.
    let mut verify_keys = Map::new();
    let mut old_verify_keys = Map::new();
    for key in &remote.keys {
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
            let vk = decode_verifying_key(&key.public_key_b64).map_err(|e| {
                error!("Bad cached public key {} for {server_name}: {e}", key.key_id);
                ApiError::Internal("Failed to read remote public keys".into())
            })?;
            if let Some(domain) = public_keys.get_mut(server_name) {
                domain.insert(key.key_id.clone(), vk);
            }
        }
    }

    let mut expanded = Map::new();
    expanded.insert("server_name".to_owned(), Value::String(server_name.to_owned()));
    expanded.insert(
        "valid_until_ts".to_owned(),
        Value::Number(remote.server.valid_until_ts.into()),
    );
    expanded.insert("verify_keys".to_owned(), Value::Object(verify_keys));
    expanded.insert("old_verify_keys".to_owned(), Value::Object(old_verify_keys));

    // Non-standard fields from the peer's own response, preserved verbatim.
    if let Value::Object(extra) = &remote.server.nonstandard_json {
        for (k, v) in extra {
            expanded.insert(k.clone(), v.clone());
        }
    }

    // Sign with every one of our keys — the notary signature.
    let mut signatures: Map<String, Value> = Map::new();
    let mut own_sigs = Map::new();
    let own = own_keys::all(&state.db.pg).await.map_err(|e| {
        error!("Failed to load own keys: {e}");
        ApiError::Internal("Failed to get own keys".into())
    })?;
    for key in &own {
        let kp = SigningKeyPair::from_base64_seed(key.key_id.clone(), &key.private_key_b64)
            .map_err(|e| {
                error!("Failed to load private key {}: {e}", key.key_id);
                ApiError::Internal("Failed to load private key".into())
            })?;
        let signature =
            signature_of_object(&Value::Object(expanded.clone()), &kp).map_err(|e| {
                error!("Failed to sign notary response: {e}");
                ApiError::Internal("Failed to sign response".into())
            })?;
        own_sigs.insert(kp.key_id.clone(), Value::String(signature));
        if let Some(domain) = public_keys.get_mut(&state.server_name) {
            domain.insert(kp.key_id.clone(), kp.verifying_key());
        }
    }
    signatures.insert(state.server_name.clone(), Value::Object(own_sigs));

    // Append the peer's own stored signatures.
    let mut peer_sigs = Map::new();
    for sig in &remote.signatures {
        peer_sigs.insert(sig.key_id.clone(), Value::String(sig.signature_b64.clone()));
    }
    signatures.insert(server_name.to_owned(), Value::Object(peer_sigs));

    expanded.insert("signatures".to_owned(), Value::Object(signatures));

    // Last-minute check over the fully assembled response.
    verify_signatures(&Value::Object(expanded.clone()), &public_keys).map_err(|e| {
        error!("Last-minute verification of notarized {server_name} response failed: {e}");
        ApiError::Internal("Failed last-minute signature verifications".into())
    })?;

    Ok(expanded)
}
