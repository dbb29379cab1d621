//! Event redaction.
//!
//! Redaction derives the stable, reduced view of an event that signatures
//! are computed over: a fixed allow-list of top-level keys, plus a per-type
//! allow-list for `content` sub-keys. Everything else — including the whole
//! `unsigned` block — is outside the signed byte stream, which is what lets
//! a signature survive a later redaction of the event.

use serde_json::{Map, Value};

use crate::error::SigningError;

/// The only defined redaction algorithm version.
pub const REDACTION_V1: &str = "v1";

/// Top-level keys that survive v1 redaction.
const KEEP_KEYS: &[&str] = &[
    "event_id",
    "type",
    "room_id",
    "sender",
    "state_key",
    "content",
    "hashes",
    "signatures",
    "depth",
    "prev_events",
    "prev_state",
    "auth_events",
    "origin",
    "origin_server_ts",
    "membership",
];

/// `content` sub-keys that survive v1 redaction, by event type. Types not
/// listed here keep no content at all.
fn content_keep_keys(event_type: &str) -> &'static [&'static str] {
    match event_type {
        "m.room.member" => &["membership"],
        "m.room.create" => &["creator"],
        "m.room.join_rules" => &["join_rule"],
        "m.room.power_levels" => &[
            "ban",
            "events",
            "events_default",
            "kick",
            "redact",
            "state_default",
            "users",
            "users_default",
        ],
        "m.room.aliases" => &["aliases"],
        "m.room.history_visibility" => &["history_visibility"],
        _ => &[],
    }
}

/// Redact `obj` under the named algorithm.
///
/// Returns the reduced object and, separately, the extracted `unsigned`
/// block (if the original carried one) so callers can choose to retain it
/// outside the redaction boundary. Pure — the input is never mutated.
pub fn redact_object(
    obj: &Value,
    algorithm: &str,
) -> Result<(Map<String, Value>, Option<Map<String, Value>>), SigningError> {
    if algorithm != REDACTION_V1 {
        return Err(SigningError::UnsupportedAlgorithm(algorithm.to_owned()));
    }

    let map = obj.as_object().ok_or(SigningError::NotAnObject)?;

    let unsigned = match map.get("unsigned") {
        Some(Value::Object(u)) => Some(u.clone()),
        _ => None,
    };

    Ok((prune(map), unsigned))
}

fn prune(map: &Map<String, Value>) -> Map<String, Value> {
    let mut reduced = Map::new();
    for key in KEEP_KEYS {
        if let Some(v) = map.get(*key) {
            reduced.insert((*key).to_owned(), v.clone());
        }
    }

    // Reduce `content` per event type. A missing or non-string type, or a
    // non-object content value, leaves an empty content object.
    let event_type = reduced.get("type").and_then(Value::as_str).map(str::to_owned);
    if let Some(content) = reduced.get("content").cloned() {
        let mut new_content = Map::new();
        if let (Some(event_type), Value::Object(content)) = (event_type, content) {
            for key in content_keep_keys(&event_type) {
                if let Some(v) = content.get(*key) {
                    new_content.insert((*key).to_owned(), v.clone());
                }
            }
        }
        reduced.insert("content".to_owned(), Value::Object(new_content));
    }

    reduced
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_algorithm_is_rejected() {
        let err = redact_object(&json!({}), "v2").unwrap_err();
        assert!(matches!(err, SigningError::UnsupportedAlgorithm(a) if a == "v2"));
    }

    #[test]
    fn keeps_only_allow_listed_top_level_keys() {
        let (reduced, _) = redact_object(
            &json!({
                "event_id": "$1:domain",
                "type": "X",
                "secret_field": "drop me",
                "origin_server_ts": 1000
            }),
            REDACTION_V1,
        )
        .unwrap();
        assert!(reduced.contains_key("event_id"));
        assert!(reduced.contains_key("origin_server_ts"));
        assert!(!reduced.contains_key("secret_field"));
    }

    #[test]
    fn member_event_keeps_only_membership() {
        let (reduced, _) = redact_object(
            &json!({
                "type": "m.room.member",
                "content": {"membership": "join", "displayname": "Alice"}
            }),
            REDACTION_V1,
        )
        .unwrap();
        assert_eq!(reduced["content"], json!({"membership": "join"}));
    }

    #[test]
    fn power_levels_keep_the_fixed_set() {
        let (reduced, _) = redact_object(
            &json!({
                "type": "m.room.power_levels",
                "content": {
                    "ban": 50, "kick": 50, "invite": 25,
                    "users": {"@a:b": 100}, "users_default": 0
                }
            }),
            REDACTION_V1,
        )
        .unwrap();
        let content = reduced["content"].as_object().unwrap();
        assert!(content.contains_key("ban"));
        assert!(content.contains_key("users"));
        assert!(!content.contains_key("invite"));
    }

    #[test]
    fn unknown_type_empties_content() {
        let (reduced, _) =
            redact_object(&json!({"type": "X", "content": {"body": "hi"}}), REDACTION_V1).unwrap();
        assert_eq!(reduced["content"], json!({}));
    }

    #[test]
    fn missing_type_empties_content() {
        let (reduced, _) =
            redact_object(&json!({"content": {"body": "hi"}}), REDACTION_V1).unwrap();
        assert_eq!(reduced["content"], json!({}));
    }

    #[test]
    fn unsigned_is_extracted_not_kept() {
        let (reduced, unsigned) = redact_object(
            &json!({"type": "X", "unsigned": {"age_ts": 1000}}),
            REDACTION_V1,
        )
        .unwrap();
        assert!(!reduced.contains_key("unsigned"));
        assert_eq!(unsigned.unwrap()["age_ts"], json!(1000));
    }

    #[test]
    fn redaction_is_idempotent() {
        let event = json!({
            "event_id": "$0:domain",
            "type": "m.room.member",
            "room_id": "!r:domain",
            "sender": "@u:domain",
            "state_key": "@u:domain",
            "content": {"membership": "ban", "reason": "spam"},
            "depth": 4,
            "unsigned": {"age_ts": 1}
        });
        let (once, _) = redact_object(&event, REDACTION_V1).unwrap();
        let (twice, _) = redact_object(&Value::Object(once.clone()), REDACTION_V1).unwrap();
        assert_eq!(once, twice);
    }
}
