//! # signet-signing
//!
//! The pure trust engine: everything needed to turn a JSON object into
//! signable bytes and back.
//!
//! - **Canonical codec** (`canonical`): deterministic, key-sorted,
//!   whitespace-free serialization. The *only* byte stream ever hashed or
//!   signed — there is no alternate formatting path.
//! - **Content hasher** (`hash`): SHA-256 over the canonical form with
//!   volatile fields removed.
//! - **Redactor** (`redact`): reduces an event to its stable v1 subset so
//!   signatures survive removal of sensitive content.
//! - **Signer / verifier** (`sign`, `verify`): per-domain, per-key Ed25519
//!   signatures attached under `signatures`.
//! - **Key pairs** (`keypair`): this server's Ed25519 material and its
//!   storage encoding.
//!
//! All functions operate on `serde_json::Value` and are total: malformed
//! shapes produce errors, never panics.

pub mod canonical;
pub mod encoding;
pub mod error;
pub mod hash;
pub mod keypair;
pub mod redact;
pub mod sign;
pub mod verify;

pub use canonical::encode_canonical_json;
pub use error::SigningError;
pub use hash::sha256_content_hash;
pub use keypair::SigningKeyPair;
pub use redact::{redact_object, REDACTION_V1};
pub use sign::{sign_event, sign_object, signature_of_object};
pub use verify::{verify_signatures, PublicKeyMap};
