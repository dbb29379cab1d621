//! Wire types for the key-exchange API.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A single current public key entry in a key document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyKey {
    /// Unpadded-base64 Ed25519 public key bytes.
    pub key: String,
}

/// A retired public key entry, valid only up to `expired_ts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OldVerifyKey {
    pub key: String,
    pub expired_ts: i64,
}

/// The self-signed key document a server publishes at
/// `/_matrix/key/v2/server` (and that the notary re-serves, doubly signed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerKeyResult {
    pub server_name: String,
    /// Unix millisecond timestamp after which this document should be
    /// re-fetched.
    pub valid_until_ts: i64,
    #[serde(default)]
    pub verify_keys: HashMap<String, VerifyKey>,
    #[serde(default)]
    pub old_verify_keys: HashMap<String, OldVerifyKey>,
    /// Signing domain → key ID → unpadded-base64 signature.
    #[serde(default)]
    pub signatures: HashMap<String, HashMap<String, String>>,
}

/// Response shape for `/.well-known/matrix/server`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WellKnownServer {
    /// The delegated federation address (may carry an explicit port).
    #[serde(rename = "m.server")]
    pub server: String,
}
