use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::OnceLock;

/// Semantic type a document field is expected to hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Url,
    Date,
    Object,
    Array,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Url => "url",
            FieldType::Date => "date",
            FieldType::Object => "object",
            FieldType::Array => "array",
        }
    }

    pub fn matches(&self, value: &Value) -> bool {
        match self {
            FieldType::String => is_string(value),
            FieldType::Url => is_url(value),
            FieldType::Date => is_date(value),
            FieldType::Object => is_object(value),
            FieldType::Array => is_array(value),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?:([0-9]+)[-T:]+)+([0-9]{2})$").expect("date pattern is valid")
    })
}

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)(https?)://(?:www.)?([a-zA-Z0-9]+)(?:.([a-zA-Z0-9?]+))+/?")
            .expect("url pattern is valid")
    })
}

pub fn is_string(value: &Value) -> bool {
    value.is_string()
}

/// Objects and arrays both count, matching how the stored records were
/// written by earlier clients.
pub fn is_object(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}

pub fn is_array(value: &Value) -> bool {
    value.is_array()
}

/// Loose timestamp check: digit groups joined by `-`, `T` or `:`, ending in
/// two digits.
pub fn is_date(value: &Value) -> bool {
    value.as_str().map(|s| date_pattern().is_match(s)).unwrap_or(false)
}

pub fn is_url(value: &Value) -> bool {
    value.as_str().map(|s| url_pattern().is_match(s)).unwrap_or(false)
}
