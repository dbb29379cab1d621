//! Content hashing.

use serde_json::Value;
use sha2::{Digest as _, Sha256};

use crate::canonical::encode_canonical_json;
use crate::encoding::encode_unpadded_base64;
use crate::error::SigningError;

/// Compute the SHA-256 content hash of an object.
///
/// The top-level `unsigned`, `signatures` and `hashes` members are removed
/// from a copy first, so the digest is stable no matter who has signed the
/// object so far. Returned as unpadded base64, suitable for `hashes.sha256`.
pub fn sha256_content_hash(obj: &Value) -> Result<String, SigningError> {
    let mut map = obj.as_object().ok_or(SigningError::NotAnObject)?.clone();
    map.remove("unsigned");
    map.remove("signatures");
    map.remove("hashes");

    let canonical = encode_canonical_json(&Value::Object(map));
    let digest = Sha256::digest(canonical.as_bytes());
    Ok(encode_unpadded_base64(&digest))
}

#[cfg(test)]
mod tests {
    use super::sha256_content_hash;
    use serde_json::json;

    #[test]
    fn volatile_fields_do_not_affect_the_hash() {
        let bare = json!({"type": "X", "content": {"body": "hi"}});
        let decorated = json!({
            "type": "X",
            "content": {"body": "hi"},
            "unsigned": {"age_ts": 12},
            "signatures": {"domain": {"ed25519:1": "sig"}},
            "hashes": {"sha256": "stale"}
        });
        assert_eq!(sha256_content_hash(&bare).unwrap(), sha256_content_hash(&decorated).unwrap());
    }

    #[test]
    fn content_changes_the_hash() {
        let a = json!({"content": {"body": "one"}});
        let b = json!({"content": {"body": "two"}});
        assert_ne!(sha256_content_hash(&a).unwrap(), sha256_content_hash(&b).unwrap());
    }

    #[test]
    fn non_object_is_rejected() {
        assert!(sha256_content_hash(&json!([1, 2])).is_err());
    }
}
