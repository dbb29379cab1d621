//! Object and event signing.
//!
//! A signature covers the canonical form of the object *without* its
//! `signatures` and `unsigned` members. Signing an event first redacts it
//! (v1) and embeds the content hash of the original, so the signature stays
//! valid after a third party redacts the event.

use serde_json::{Map, Value};

use crate::canonical::encode_canonical_json;
use crate::error::SigningError;
use crate::hash::sha256_content_hash;
use crate::keypair::SigningKeyPair;
use crate::redact::{redact_object, REDACTION_V1};

/// Sign `obj` for `domain` with this key pair, returning the signed object.
///
/// Any pre-existing `signatures` entries are preserved; only the
/// `(domain, key_id)` slot being produced is overwritten. The `unsigned`
/// block is carried through untouched.
pub fn sign_object(
    obj: Value,
    domain: &str,
    kp: &SigningKeyPair,
) -> Result<Value, SigningError> {
    let Value::Object(mut map) = obj else {
        return Err(SigningError::NotAnObject);
    };

    let unsigned = map.remove("unsigned");
    let signatures = map.remove("signatures");

    let body = Value::Object(map);
    let canonical = encode_canonical_json(&body);
    let signature = kp.sign_to_base64(canonical.as_bytes());
    let Value::Object(mut map) = body else { unreachable!() };

    let mut signatures = match signatures {
        Some(Value::Object(m)) => m,
        _ => Map::new(),
    };
    let domain_sigs = signatures
        .entry(domain.to_owned())
        .or_insert_with(|| Value::Object(Map::new()));
    if !domain_sigs.is_object() {
        *domain_sigs = Value::Object(Map::new());
    }
    if let Some(m) = domain_sigs.as_object_mut() {
        m.insert(kp.key_id.clone(), Value::String(signature));
    }
    map.insert("signatures".to_owned(), Value::Object(signatures));

    if let Some(u) = unsigned {
        map.insert("unsigned".to_owned(), u);
    }

    Ok(Value::Object(map))
}

/// Sign an event: redact under v1, embed the content hash of the *original*
/// object under `hashes.sha256`, re-attach the extracted `unsigned` block,
/// then sign the reduced object.
pub fn sign_event(
    obj: Value,
    domain: &str,
    kp: &SigningKeyPair,
) -> Result<Value, SigningError> {
    let (mut redacted, unsigned) = redact_object(&obj, REDACTION_V1)?;

    let content_hash = sha256_content_hash(&obj)?;
    redacted.insert(
        "hashes".to_owned(),
        serde_json::json!({ "sha256": content_hash }),
    );

    // Taken off again inside sign_object, but carrying it down keeps the
    // extraction in one place.
    if let Some(u) = unsigned {
        redacted.insert("unsigned".to_owned(), Value::Object(u));
    }

    sign_object(Value::Object(redacted), domain, kp)
}

/// Produce the detached signature this key pair would attach to `obj`,
/// without mutating it. Used by the notary to collect signatures from
/// several keys over the same response.
pub fn signature_of_object(obj: &Value, kp: &SigningKeyPair) -> Result<String, SigningError> {
    let mut map = obj.as_object().ok_or(SigningError::NotAnObject)?.clone();
    map.remove("signatures");
    map.remove("unsigned");
    let canonical = encode_canonical_json(&Value::Object(map));
    Ok(kp.sign_to_base64(canonical.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // Well-known test seed; the signatures below are fixed by the wire
    // format and must never change.
    pub(crate) const TEST_SEED_B64: &str = "YJDBA9Xnr2sVqXD9Vj7XVUnmFZcZrlw8Md7kMW+3XA1";
    pub(crate) const TEST_KEY_ID: &str = "ed25519:1";
    pub(crate) const TEST_DOMAIN: &str = "domain";

    pub(crate) fn test_keypair() -> SigningKeyPair {
        SigningKeyPair::from_base64_seed(TEST_KEY_ID, TEST_SEED_B64).unwrap()
    }

    fn signature_in(signed: &Value, domain: &str, key_id: &str) -> String {
        signed["signatures"][domain][key_id]
            .as_str()
            .expect("signature present")
            .to_owned()
    }

    #[test]
    fn golden_empty_object() {
        let signed = sign_object(json!({}), TEST_DOMAIN, &test_keypair()).unwrap();
        assert_eq!(
            signature_in(&signed, TEST_DOMAIN, TEST_KEY_ID),
            "K8280/U9SSy9IVtjBuVeLr+HpOB4BQFWbg+UZaADMtTdGYI7Geitb76LTrr5QV/7Xg4ahLwYGYZzuHGZKM5ZAQ"
        );
    }

    #[test]
    fn golden_object_with_content() {
        let signed =
            sign_object(json!({"one": 1, "two": "Two"}), TEST_DOMAIN, &test_keypair()).unwrap();
        assert_eq!(
            signature_in(&signed, TEST_DOMAIN, TEST_KEY_ID),
            "KqmLSbO39/Bzb0QIYE82zqLwsA+PDzYIpIRA2sRQ4sL53+sN6/fpNSoqE7BP7vBZhG6kYdD13EIMJpvhJI+6Bw"
        );
        // Content is untouched.
        assert_eq!(signed["one"], json!(1));
        assert_eq!(signed["two"], json!("Two"));
    }

    #[test]
    fn golden_minimal_event() {
        let event = json!({
            "room_id": "!x:domain",
            "sender": "@a:domain",
            "origin": "domain",
            "origin_server_ts": 1000000,
            "signatures": {},
            "hashes": {},
            "type": "X",
            "content": {},
            "prev_events": [],
            "auth_events": [],
            "depth": 3,
            "unsigned": {"age_ts": 1000000}
        });
        let signed = sign_event(event, TEST_DOMAIN, &test_keypair()).unwrap();
        assert_eq!(
            signature_in(&signed, TEST_DOMAIN, TEST_KEY_ID),
            "KxwGjPSDEtvnFgU00fwFz+l6d2pJM6XBIaMEn81SXPTRl16AqLAYqfIReFGZlHi5KLjAWbOoMszkwsQma+lYAg"
        );
    }

    #[test]
    fn golden_redactable_event() {
        let event = json!({
            "content": {"body": "Here is the message content"},
            "event_id": "$0:domain",
            "origin": "domain",
            "origin_server_ts": 1000000,
            "type": "m.room.message",
            "room_id": "!r:domain",
            "sender": "@u:domain",
            "signatures": {},
            "unsigned": {"age_ts": 1000000}
        });
        let signed = sign_event(event, TEST_DOMAIN, &test_keypair()).unwrap();
        assert_eq!(
            signature_in(&signed, TEST_DOMAIN, TEST_KEY_ID),
            "Wm+VzmOUOz08Ds+0NTWb1d4CZrVsJSikkeRxh6aCcUwu6pNC78FunoD7KNWzqFn241eYHYMGCA5McEiVPdhzBA"
        );
    }

    #[test]
    fn existing_signatures_are_preserved() {
        let obj = json!({
            "one": 1,
            "signatures": {"other.server": {"ed25519:z": "keepme"}}
        });
        let signed = sign_object(obj, TEST_DOMAIN, &test_keypair()).unwrap();
        assert_eq!(signed["signatures"]["other.server"]["ed25519:z"], json!("keepme"));
        assert!(signed["signatures"][TEST_DOMAIN][TEST_KEY_ID].is_string());
    }

    #[test]
    fn unsigned_is_carried_through_but_not_signed() {
        let with = json!({"one": 1, "unsigned": {"age_ts": 5}});
        let without = json!({"one": 1});
        let kp = test_keypair();
        let signed_with = sign_object(with, TEST_DOMAIN, &kp).unwrap();
        let signed_without = sign_object(without, TEST_DOMAIN, &kp).unwrap();
        // Same signature either way, and unsigned survives.
        assert_eq!(
            signed_with["signatures"][TEST_DOMAIN][TEST_KEY_ID],
            signed_without["signatures"][TEST_DOMAIN][TEST_KEY_ID]
        );
        assert_eq!(signed_with["unsigned"]["age_ts"], json!(5));
    }

    #[test]
    fn non_object_input_is_rejected() {
        assert!(sign_object(json!("scalar"), TEST_DOMAIN, &test_keypair()).is_err());
    }

    #[test]
    fn event_signature_survives_redaction() {
        // Sign a message event, then redact the signed form: the signature
        // and hash fields must be identical in both.
        let event = json!({
            "content": {"body": "sensitive"},
            "event_id": "$0:domain",
            "origin": "domain",
            "origin_server_ts": 1,
            "type": "m.room.message",
            "room_id": "!r:domain",
            "sender": "@u:domain"
        });
        let signed = sign_event(event, TEST_DOMAIN, &test_keypair()).unwrap();
        let (redacted, _) = redact_object(&signed, REDACTION_V1).unwrap();
        assert_eq!(Value::Object(redacted.clone())["signatures"], signed["signatures"]);
        assert_eq!(Value::Object(redacted)["hashes"], signed["hashes"]);
    }
}
