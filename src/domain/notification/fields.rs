//! Helpers for pulling typed fields out of decoded JSON.

use serde_json::{Map, Value};

use crate::domain::foundation::Timestamp;

use super::ParseError;

pub(crate) fn object<'a>(
    value: &'a Value,
    field: &str,
) -> Result<&'a Map<String, Value>, ParseError> {
    value
        .as_object()
        .ok_or_else(|| ParseError::invalid(field, "expected a JSON object"))
}

pub(crate) fn opt_str<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

pub(crate) fn req_str<'a>(
    obj: &'a Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<&'a str, ParseError> {
    opt_str(obj, key).ok_or_else(|| ParseError::missing(path))
}

/// Integer that platforms send either as a JSON number or a numeric string.
pub(crate) fn opt_i64(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<Option<i64>, ParseError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| ParseError::invalid(path, "expected an integer")),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| ParseError::invalid(path, format!("'{}' is not an integer", s))),
        Some(_) => Err(ParseError::invalid(path, "expected an integer")),
    }
}

pub(crate) fn opt_millis(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<Option<Timestamp>, ParseError> {
    match opt_i64(obj, key, path)? {
        None => Ok(None),
        Some(ms) => Timestamp::from_unix_millis(ms)
            .map(Some)
            .ok_or_else(|| ParseError::invalid(path, "timestamp out of range")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn integers_accept_numbers_and_strings() {
        let value = json!({"a": 5, "b": "7", "c": "x", "d": null});
        let obj = value.as_object().unwrap();
        assert_eq!(opt_i64(obj, "a", "a").unwrap(), Some(5));
        assert_eq!(opt_i64(obj, "b", "b").unwrap(), Some(7));
        assert!(opt_i64(obj, "c", "c").is_err());
        assert_eq!(opt_i64(obj, "d", "d").unwrap(), None);
        assert_eq!(opt_i64(obj, "missing", "missing").unwrap(), None);
    }

    #[test]
    fn blank_strings_count_as_missing() {
        let value = json!({"token": "  "});
        let obj = value.as_object().unwrap();
        assert!(matches!(
            req_str(obj, "token", "data.token"),
            Err(ParseError::MissingField(ref f)) if f == "data.token"
        ));
    }
}
