//! Signature verification.
//!
//! Verification is all-or-nothing: every `(domain, key_id)` signature
//! present on the object must validate against a supplied public key. An
//! object signed by a domain the caller did not supply keys for is rejected,
//! not skipped.

use std::collections::HashMap;

use ed25519_dalek::{Signature, Verifier as _, VerifyingKey};
use serde_json::Value;

use crate::canonical::encode_canonical_json;
use crate::encoding::decode_unpadded_base64;
use crate::error::SigningError;

/// Public keys by signing domain, then key ID.
pub type PublicKeyMap = HashMap<String, HashMap<String, VerifyingKey>>;

/// Check every signature on `obj` against `public_keys`.
pub fn verify_signatures(obj: &Value, public_keys: &PublicKeyMap) -> Result<(), SigningError> {
    let mut map = obj.as_object().ok_or(SigningError::NotAnObject)?.clone();

    map.remove("unsigned");
    let signatures = match map.remove("signatures") {
        Some(Value::Object(m)) if !m.is_empty() => m,
        _ => return Err(SigningError::NoSignatures),
    };

    let canonical = encode_canonical_json(&Value::Object(map));

    for (domain, domain_sigs) in &signatures {
        let domain_keys = public_keys
            .get(domain)
            .ok_or_else(|| SigningError::UnknownSigner(domain.clone()))?;

        let domain_sigs = domain_sigs.as_object().ok_or_else(|| {
            SigningError::MalformedSignature { domain: domain.clone(), key_id: String::new() }
        })?;

        for (key_id, sig_value) in domain_sigs {
            let key = domain_keys.get(key_id).ok_or_else(|| SigningError::UnknownKey {
                domain: domain.clone(),
                key_id: key_id.clone(),
            })?;

            let malformed = || SigningError::MalformedSignature {
                domain: domain.clone(),
                key_id: key_id.clone(),
            };
            let sig_b64 = sig_value.as_str().ok_or_else(malformed)?;
            let sig_bytes = decode_unpadded_base64(sig_b64).map_err(|_| malformed())?;
            let sig_bytes: [u8; 64] =
                sig_bytes.as_slice().try_into().map_err(|_| malformed())?;
            let signature = Signature::from_bytes(&sig_bytes);

            key.verify(canonical.as_bytes(), &signature).map_err(|_| {
                SigningError::InvalidSignature { domain: domain.clone(), key_id: key_id.clone() }
            })?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypair::SigningKeyPair;
    use crate::sign::sign_object;
    use serde_json::json;

    fn keys_for(domain: &str, kp: &SigningKeyPair) -> PublicKeyMap {
        let mut by_id = HashMap::new();
        by_id.insert(kp.key_id.clone(), kp.verifying_key());
        let mut map = HashMap::new();
        map.insert(domain.to_owned(), by_id);
        map
    }

    #[test]
    fn sign_verify_round_trip() {
        let kp = SigningKeyPair::generate();
        let signed = sign_object(json!({"one": 1, "two": "Two"}), "domain", &kp).unwrap();
        verify_signatures(&signed, &keys_for("domain", &kp)).unwrap();
    }

    #[test]
    fn empty_object_round_trip() {
        let kp = SigningKeyPair::generate();
        let signed = sign_object(json!({}), "domain", &kp).unwrap();
        verify_signatures(&signed, &keys_for("domain", &kp)).unwrap();
    }

    #[test]
    fn tampered_content_is_detected() {
        let kp = SigningKeyPair::generate();
        let mut signed = sign_object(json!({"amount": 100}), "domain", &kp).unwrap();
        signed["amount"] = json!(101);
        let err = verify_signatures(&signed, &keys_for("domain", &kp)).unwrap_err();
        assert!(matches!(err, SigningError::InvalidSignature { .. }));
    }

    #[test]
    fn missing_signatures_map_is_rejected() {
        let kp = SigningKeyPair::generate();
        let err = verify_signatures(&json!({"one": 1}), &keys_for("domain", &kp)).unwrap_err();
        assert!(matches!(err, SigningError::NoSignatures));
    }

    #[test]
    fn empty_signatures_map_is_rejected() {
        let kp = SigningKeyPair::generate();
        let err = verify_signatures(&json!({"one": 1, "signatures": {}}), &keys_for("domain", &kp))
            .unwrap_err();
        assert!(matches!(err, SigningError::NoSignatures));
    }

    #[test]
    fn unknown_domain_is_rejected_outright() {
        let kp = SigningKeyPair::generate();
        let signed = sign_object(json!({"one": 1}), "stranger.example", &kp).unwrap();
        let err = verify_signatures(&signed, &keys_for("domain", &kp)).unwrap_err();
        assert!(matches!(err, SigningError::UnknownSigner(d) if d == "stranger.example"));
    }

    #[test]
    fn unknown_key_id_is_rejected() {
        let signer = SigningKeyPair::generate();
        let other = SigningKeyPair::generate();
        let signed = sign_object(json!({"one": 1}), "domain", &signer).unwrap();
        // Supply keys for the domain, but not the key that signed.
        let err = verify_signatures(&signed, &keys_for("domain", &other)).unwrap_err();
        assert!(matches!(err, SigningError::UnknownKey { .. }));
    }

    #[test]
    fn undecodable_signature_is_malformed() {
        let kp = SigningKeyPair::generate();
        let mut signed = sign_object(json!({"one": 1}), "domain", &kp).unwrap();
        signed["signatures"]["domain"][kp.key_id.clone()] = json!("???not-base64???");
        let err = verify_signatures(&signed, &keys_for("domain", &kp)).unwrap_err();
        assert!(matches!(err, SigningError::MalformedSignature { .. }));
    }

    #[test]
    fn every_signature_must_validate() {
        // Two domains sign; the caller only knows one of them.
        let kp1 = SigningKeyPair::generate();
        let kp2 = SigningKeyPair::generate();
        let signed = sign_object(json!({"one": 1}), "first.example", &kp1).unwrap();
        let signed = sign_object(signed, "second.example", &kp2).unwrap();

        let err = verify_signatures(&signed, &keys_for("first.example", &kp1)).unwrap_err();
        assert!(matches!(err, SigningError::UnknownSigner(d) if d == "second.example"));

        // With both supplied, it verifies.
        let mut both = keys_for("first.example", &kp1);
        both.extend(keys_for("second.example", &kp2));
        verify_signatures(&signed, &both).unwrap();
    }

    #[test]
    fn unsigned_may_differ_without_breaking_verification() {
        let kp = SigningKeyPair::generate();
        let mut signed = sign_object(json!({"one": 1}), "domain", &kp).unwrap();
        signed["unsigned"] = json!({"age_ts": 99999});
        verify_signatures(&signed, &keys_for("domain", &kp)).unwrap();
    }
}
