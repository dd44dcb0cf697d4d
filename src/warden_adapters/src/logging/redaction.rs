use serde_json::Value;

const REDACTED: &str = "***REDACTED***";

/// Keys whose values are replaced outright, matched case-insensitively.
const SENSITIVE_FIELDS: &[&str] = &[
    "password",
    "password_hash",
    "token",
    "access_token",
    "refresh_token",
    "api_key",
    "secret",
    "jwt_secret",
];

/// Keys whose values are partially masked (last four characters survive).
const PARTIAL_MASK_FIELDS: &[&str] = &["email", "phone"];

/// Mask all but the last four characters of a value.
pub fn mask_partial(value: &str) -> String {
    let char_count = value.chars().count();
    if char_count > 4 {
        let tail: String = value.chars().skip(char_count - 4).collect();
        format!("***{tail}")
    } else {
        "***".to_string()
    }
}

/// Scrub structured log payloads before they reach a subscriber or an audit
/// sink. Credential-bearing fields disappear entirely; identifying fields
/// keep just enough of a tail to correlate. Applies recursively through
/// objects and arrays.
pub fn sanitize_for_logging(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sanitized = serde_json::Map::with_capacity(map.len());
            for (key, entry) in map {
                let key_lower = key.to_lowercase();
                let replacement = if SENSITIVE_FIELDS.contains(&key_lower.as_str()) {
                    Value::String(REDACTED.to_string())
                } else if PARTIAL_MASK_FIELDS.contains(&key_lower.as_str()) {
                    match entry {
                        Value::String(s) => Value::String(mask_partial(s)),
                        other => sanitize_for_logging(other),
                    }
                } else {
                    sanitize_for_logging(entry)
                };
                sanitized.insert(key.clone(), replacement);
            }
            Value::Object(sanitized)
        }
        Value::Array(entries) => Value::Array(entries.iter().map(sanitize_for_logging).collect()),
        other => other.clone(),
    }
}
