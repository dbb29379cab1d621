//! Signing and verification error types.

use thiserror::Error;

/// Errors from the canonicalization / redaction / signing / verification
/// pipeline.
#[derive(Debug, Error)]
pub enum SigningError {
    #[error("unknown redaction algorithm '{0}'")]
    UnsupportedAlgorithm(String),

    #[error("value must be a JSON object")]
    NotAnObject,

    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),

    // ── Verification ────────────────────────────────────────────────────────
    #[error("no signatures found on object")]
    NoSignatures,

    #[error("missing public keys for domain '{0}'")]
    UnknownSigner(String),

    #[error("missing public key '{key_id}' for domain '{domain}'")]
    UnknownKey { domain: String, key_id: String },

    #[error("malformed signature for {domain} {key_id}")]
    MalformedSignature { domain: String, key_id: String },

    #[error("signature verification failed for {domain} {key_id}")]
    InvalidSignature { domain: String, key_id: String },
}
