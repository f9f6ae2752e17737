//! Query-string encoding of call parameters.
//!
//! Reads travel as `GET` requests, so their parameters have to fit in a
//! query string. Only a top-level object can: each member becomes one
//! `name=value` pair. Strings go out raw (`allorgs=yes`) unless the raw text
//! would itself read back as JSON, in which case they are quoted. Every
//! other value goes out as JSON text (`allorgs=true`, `ids=[1,2]`). Decoding
//! tries JSON first and falls back to a plain string, which makes the pair
//! of functions lossless for objects.

use serde_json::{Map, Value};

use crate::error::{Error, Result};

pub(crate) fn encode(key: &str, params: &Value) -> Result<Vec<(String, String)>> {
    let members = match params {
        Value::Null => return Ok(Vec::new()),
        Value::Object(members) => members,
        _ => {
            return Err(Error::InvalidParams {
                key: key.to_owned(),
                message: "query parameters must be an object".into(),
            });
        }
    };
    Ok(members
        .iter()
        .map(|(name, value)| (name.clone(), encode_value(value)))
        .collect())
}

fn encode_value(value: &Value) -> String {
    match value {
        Value::String(s) if serde_json::from_str::<Value>(s).is_err() => s.clone(),
        other => other.to_string(),
    }
}

/// Decodes a raw (still percent-encoded) query string. Repeated names keep
/// the last value. An empty query is `null`, the same value a read without
/// parameters carries in process.
pub(crate) fn decode(query: &str) -> Value {
    if query.is_empty() {
        return Value::Null;
    }
    let members: Map<String, Value> = url::form_urlencoded::parse(query.as_bytes())
        .map(|(name, raw)| {
            let value = serde_json::from_str(&raw).unwrap_or_else(|_| Value::String(raw.into_owned()));
            (name.into_owned(), value)
        })
        .collect();
    Value::Object(members)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn query_string(pairs: &[(String, String)]) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish()
    }

    #[test]
    fn booleans_read_naturally() {
        let pairs = encode("docs/all", &json!({ "allorgs": true })).unwrap();
        assert_eq!(query_string(&pairs), "allorgs=true");
    }

    #[test]
    fn strings_that_look_like_json_survive() {
        let params = json!({ "n": "123", "flag": "true", "name": "ada lovelace", "real": 123, "list": [1, "x"] });
        let pairs = encode("k", &params).unwrap();
        assert_eq!(decode(&query_string(&pairs)), params);
    }

    #[test]
    fn null_and_empty() {
        assert!(encode("k", &Value::Null).unwrap().is_empty());
        assert_eq!(decode(""), Value::Null);
        assert_eq!(decode("a=1"), json!({ "a": 1 }));
    }

    #[test]
    fn non_objects_are_rejected() {
        assert!(matches!(encode("k", &json!([1, 2])), Err(Error::InvalidParams { .. })));
    }
}
