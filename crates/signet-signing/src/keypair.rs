//! Ed25519 server signing key pairs.
//!
//! # Key IDs
//! Key IDs follow the `ed25519:<fingerprint>` convention, where the
//! fingerprint is the first 6 bytes of the public key, hex-encoded.
//!
//! # Storage
//! A pair is persisted as its unpadded-base64 32-byte seed plus the
//! unpadded-base64 public key. Loading from a stored row keeps the row's
//! key ID rather than re-deriving it.

use ed25519_dalek::{Signer as _, SigningKey, VerifyingKey};
use rand_core::OsRng;

use crate::encoding::{decode_unpadded_base64, encode_unpadded_base64};
use crate::error::SigningError;

/// An Ed25519 signing key pair owned by this server.
pub struct SigningKeyPair {
    /// Key ID in the format `ed25519:<12-char-hex>`.
    pub key_id: String,
    signing_key: SigningKey,
}

impl SigningKeyPair {
    /// Generate a brand-new random Ed25519 key pair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let key_id = derive_key_id(signing_key.verifying_key().as_bytes());
        Self { key_id, signing_key }
    }

    /// Reconstruct a pair from a raw 32-byte seed under an existing key ID.
    pub fn from_seed(key_id: impl Into<String>, seed: &[u8]) -> Result<Self, SigningError> {
        let bytes: [u8; 32] = seed
            .try_into()
            .map_err(|_| SigningError::InvalidKeyMaterial("seed must be exactly 32 bytes".into()))?;
        Ok(Self { key_id: key_id.into(), signing_key: SigningKey::from_bytes(&bytes) })
    }

    /// Reconstruct a pair from the stored unpadded-base64 seed.
    pub fn from_base64_seed(key_id: impl Into<String>, seed_b64: &str) -> Result<Self, SigningError> {
        let seed = decode_unpadded_base64(seed_b64)
            .map_err(|_| SigningError::InvalidKeyMaterial("seed is not valid base64".into()))?;
        Self::from_seed(key_id, &seed)
    }

    /// The 32-byte seed, unpadded base64, for persistence.
    pub fn seed_base64(&self) -> String {
        encode_unpadded_base64(&self.signing_key.to_bytes())
    }

    /// The public verifying key.
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// The public key as unpadded base64, as served in `verify_keys`.
    pub fn public_key_base64(&self) -> String {
        encode_unpadded_base64(self.signing_key.verifying_key().as_bytes())
    }

    /// Sign arbitrary bytes, returning the unpadded-base64 signature.
    pub fn sign_to_base64(&self, bytes: &[u8]) -> String {
        encode_unpadded_base64(&self.signing_key.sign(bytes).to_bytes())
    }
}

impl std::fmt::Debug for SigningKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print private key material.
        f.debug_struct("SigningKeyPair").field("key_id", &self.key_id).finish_non_exhaustive()
    }
}

/// Derive a stable key ID from raw public key bytes.
fn derive_key_id(pubkey_bytes: &[u8]) -> String {
    format!("ed25519:{}", hex::encode(&pubkey_bytes[..6]))
}

/// Decode an unpadded-base64 public key into a verifying key.
pub fn decode_verifying_key(pubkey_b64: &str) -> Result<VerifyingKey, SigningError> {
    let bytes = decode_unpadded_base64(pubkey_b64)
        .map_err(|_| SigningError::InvalidKeyMaterial("public key is not valid base64".into()))?;
    let bytes: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| SigningError::InvalidKeyMaterial("public key must be 32 bytes".into()))?;
    VerifyingKey::from_bytes(&bytes)
        .map_err(|_| SigningError::InvalidKeyMaterial("not a valid Ed25519 point".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_key_id_has_expected_shape() {
        let kp = SigningKeyPair::generate();
        let fingerprint = kp.key_id.strip_prefix("ed25519:").expect("prefix");
        assert_eq!(fingerprint.len(), 12);
    }

    #[test]
    fn seed_round_trip_is_stable() {
        let kp1 = SigningKeyPair::generate();
        let kp2 = SigningKeyPair::from_base64_seed(kp1.key_id.clone(), &kp1.seed_base64()).unwrap();
        assert_eq!(kp1.public_key_base64(), kp2.public_key_base64());
        assert_eq!(kp1.sign_to_base64(b"msg"), kp2.sign_to_base64(b"msg"));
    }

    #[test]
    fn decode_verifying_key_rejects_garbage() {
        assert!(decode_verifying_key("not//valid//length").is_err());
        assert!(decode_verifying_key("!!!!").is_err());
    }
}
