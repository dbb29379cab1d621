//! Key rows — this server's own signing keys and the per-peer remote cache.
//!
//! Timestamps are unix milliseconds. An `expires_ts` of `0` marks a key as
//! currently active; a non-zero value marks a retired key kept only so old
//! signatures can still be checked.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One of this server's Ed25519 signing keys (`self_keys` table).
///
/// `private_key_b64` is the unpadded-base64 32-byte seed; `public_key_b64`
/// the unpadded-base64 verifying key.
#[derive(Debug, Clone, FromRow)]
pub struct OwnKey {
    pub key_id: String,
    pub public_key_b64: String,
    pub private_key_b64: String,
    pub expires_ts: i64,
}

/// Cached metadata for a remote server's key document (`remote_servers`).
///
/// `updated_ts` is when we last fetched the document; `valid_until_ts` is the
/// peer-declared expiry. `nonstandard_json` preserves any top-level fields of
/// the peer's response outside the standard key-result shape, verbatim.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct RemoteServer {
    pub server_name: String,
    pub updated_ts: i64,
    pub valid_until_ts: i64,
    pub nonstandard_json: serde_json::Value,
}

/// A single cached public key belonging to a remote server (`remote_keys`).
#[derive(Debug, Clone, FromRow)]
pub struct RemoteKey {
    pub server_name: String,
    pub key_id: String,
    pub public_key_b64: String,
    pub expires_ts: i64,
}

/// A signature the peer placed over its own key document (`remote_signatures`).
#[derive(Debug, Clone, FromRow)]
pub struct RemoteSignature {
    pub server_name: String,
    pub key_id: String,
    pub signature_b64: String,
}

/// A fully-hydrated remote key-cache entry: metadata plus child rows.
#[derive(Debug, Clone)]
pub struct CachedRemoteKeys {
    pub server: RemoteServer,
    pub keys: Vec<RemoteKey>,
    pub signatures: Vec<RemoteSignature>,
}
