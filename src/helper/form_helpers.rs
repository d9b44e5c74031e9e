use std::collections::HashMap;
use thiserror::Error;
use url::form_urlencoded;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PayloadError {
    #[error("Invalid JSON data.")]
    InvalidJson,
    #[error("Invalid form data.")]
    InvalidForm,
}

/// Reads a flat key/value payload from either a JSON object or a
/// form-encoded body, picked by content type. Scalar JSON values are
/// stringified; `null` becomes an empty string.
pub fn parse_payload(content_type: &str, body: &[u8]) -> Result<HashMap<String, String>, PayloadError> {
    if content_type.starts_with("application/json") {
        let value: serde_json::Value = serde_json::from_slice(body).map_err(|_| PayloadError::InvalidJson)?;
        let object = value.as_object().ok_or(PayloadError::InvalidJson)?;
        return Ok(object
            .iter()
            .map(|(key, value)| {
                let text = match value {
                    serde_json::Value::String(s) => s.clone(),
                    serde_json::Value::Null => String::new(),
                    other => other.to_string(),
                };
                (key.clone(), text)
            })
            .collect());
    }

    let body = std::str::from_utf8(body).map_err(|_| PayloadError::InvalidForm)?;
    Ok(form_urlencoded::parse(body.as_bytes()).into_owned().collect())
}

pub fn field<'a>(form: &'a HashMap<String, String>, key: &str) -> &'a str {
    form.get(key).map(|s| s.trim()).unwrap_or("")
}

/// `None` when the field is absent or blank.
pub fn optional_field(form: &HashMap<String, String>, key: &str) -> Option<String> {
    let value = field(form, key);
    (!value.is_empty()).then(|| value.to_string())
}

/// HTML checkboxes are only submitted when ticked.
pub fn checkbox(form: &HashMap<String, String>, key: &str) -> bool {
    matches!(field(form, key), "on" | "true" | "1" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_payload_is_flattened_to_strings() {
        let body = br#"{"email": "a@b.io", "count": 3, "flag": true, "none": null}"#;
        let map = parse_payload("application/json; charset=utf-8", body).unwrap();
        assert_eq!(map["email"], "a@b.io");
        assert_eq!(map["count"], "3");
        assert_eq!(map["flag"], "true");
        assert_eq!(map["none"], "");
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert_eq!(parse_payload("application/json", b"{nope"), Err(PayloadError::InvalidJson));
        assert_eq!(parse_payload("application/json", b"[1, 2]"), Err(PayloadError::InvalidJson));
    }

    #[test]
    fn form_payload_and_field_getters() {
        let map = parse_payload("application/x-www-form-urlencoded", b"nom=+Ana+&featured=on&demo=").unwrap();
        assert_eq!(field(&map, "nom"), "Ana");
        assert_eq!(field(&map, "missing"), "");
        assert!(checkbox(&map, "featured"));
        assert!(!checkbox(&map, "active"));
        assert_eq!(optional_field(&map, "demo"), None);
    }
}
