//! Serde helpers for the data-mart's loosely typed JSON: numbers arrive either as
//! JSON numbers or as strings (`"12"`, `"3.0"`), and optional fields may be `null`
//! or missing.

use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;

/// Deserializes a string, number or boolean into its textual form.
pub(crate) fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(de::Error::custom(format!(
            "expected a string or number, found {other}"
        ))),
    }
}

/// Like [`text`], but `null` (and, with `#[serde(default)]`, a missing field) becomes `None`.
pub(crate) fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(de::Error::custom(format!(
            "expected a string, number or null, found {other}"
        ))),
    }
}

/// Deserializes an integer identifier given as a number or a numeric string.
pub(crate) fn integer<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = text(deserializer)?;
    parse_integer(&raw).ok_or_else(|| de::Error::custom(format!("invalid integer '{raw}'")))
}

/// Parses `"12"`, `"12.0"` or `" 12 "` into `12`. Fractions are truncated, like an
/// integer cast of a float.
pub(crate) fn parse_integer(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(value) = raw.parse::<i64>() {
        return Some(value);
    }
    let value = raw.parse::<f64>().ok()?;
    if value.is_finite() {
        Some(value.trunc() as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_integer_accepts_float_strings() {
        assert_eq!(parse_integer("3"), Some(3));
        assert_eq!(parse_integer("3.0"), Some(3));
        assert_eq!(parse_integer(" 7.9 "), Some(7));
        assert_eq!(parse_integer("NaN"), None);
        assert_eq!(parse_integer("three"), None);
        assert_eq!(parse_integer(""), None);
    }
}
