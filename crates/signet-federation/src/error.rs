//! Federation-specific error types.

use signet_signing::SigningError;
use thiserror::Error;

/// Errors that can occur in federation operations.
#[derive(Debug, Error)]
pub enum FederationError {
    // ── Discovery ───────────────────────────────────────────────────────────
    #[error("Failed to resolve server '{server}': {reason}")]
    Discovery { server: String, reason: String },

    // ── Remote communication ─────────────────────────────────────────────────
    #[error("HTTP error communicating with remote server '{server}': {reason}")]
    RemoteHttp { server: String, reason: String },

    #[error("Remote server '{server}' returned an unusable key document: {reason}")]
    MalformedResponse { server: String, reason: String },

    // ── Verification ────────────────────────────────────────────────────────
    #[error("Key document from '{server}' failed signature verification")]
    VerificationFailed {
        server: String,
        #[source]
        source: SigningError,
    },

    // ── Storage / general ────────────────────────────────────────────────────
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}
