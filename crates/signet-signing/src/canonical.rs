//! Canonical JSON encoding.
//!
//! Object members are emitted in strictly ascending order of their UTF-8 key
//! bytes, with no insignificant whitespace. The output is byte-stable across
//! calls and processes and is the sole input to hashing and signing —
//! interoperability with peer servers depends on every implementation
//! producing these exact bytes.

use serde_json::Value;

/// Serialize `value` to its canonical form.
pub fn encode_canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        // serde_json renders numbers minimally (no trailing zeros, no
        // positive exponent sign games), which is what peers emit too.
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => write_json_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_json_string(key, out);
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
    }
}

/// Write a JSON string literal. Escapes only what JSON requires: quote,
/// backslash and control characters. Everything else passes through as
/// raw UTF-8.
fn write_json_string(s: &str, out: &mut String) {
    const HEX: &[u8; 16] = b"0123456789abcdef";

    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{08}' => out.push_str("\\b"),
            '\u{09}' => out.push_str("\\t"),
            '\u{0a}' => out.push_str("\\n"),
            '\u{0c}' => out.push_str("\\f"),
            '\u{0d}' => out.push_str("\\r"),
            c if (c as u32) < 0x20 => {
                let b = c as u32;
                out.push_str("\\u00");
                out.push(HEX[(b >> 4) as usize] as char);
                out.push(HEX[(b & 0xf) as usize] as char);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::encode_canonical_json;
    use serde_json::json;

    #[test]
    fn empty_object() {
        assert_eq!(encode_canonical_json(&json!({})), "{}");
    }

    #[test]
    fn keys_are_sorted() {
        let v = json!({"two": "Two", "one": 1});
        assert_eq!(encode_canonical_json(&v), r#"{"one":1,"two":"Two"}"#);
    }

    #[test]
    fn nested_objects_and_arrays() {
        let v = json!({
            "b": [{"z": null, "a": true}, 2],
            "a": {"y": 1.5, "x": "s"}
        });
        assert_eq!(
            encode_canonical_json(&v),
            r#"{"a":{"x":"s","y":1.5},"b":[{"a":true,"z":null},2]}"#
        );
    }

    #[test]
    fn independent_of_insertion_order() {
        let a: serde_json::Value =
            serde_json::from_str(r#"{"one": 1, "two": "Two", "three": {"b": 2, "a": 1}}"#).unwrap();
        let b: serde_json::Value =
            serde_json::from_str(r#"{"three": {"a": 1, "b": 2}, "two": "Two", "one": 1}"#).unwrap();
        assert_eq!(encode_canonical_json(&a), encode_canonical_json(&b));
    }

    #[test]
    fn repeated_calls_are_stable() {
        let v = json!({"m": {"k": [1, 2, 3]}, "n": "text"});
        assert_eq!(encode_canonical_json(&v), encode_canonical_json(&v));
    }

    #[test]
    fn string_escapes() {
        let v = json!({"k": "a\"b\\c\nd\u{01}e"});
        assert_eq!(encode_canonical_json(&v), "{\"k\":\"a\\\"b\\\\c\\nd\\u0001e\"}");
    }

    #[test]
    fn unicode_passes_through_unescaped() {
        let v = json!({"k": "日本語 ünïcødé"});
        assert_eq!(encode_canonical_json(&v), "{\"k\":\"日本語 ünïcødé\"}");
    }
}
