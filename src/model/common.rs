use chrono::{Local, SecondsFormat};
use serde_json::{Map, Value};
use uuid::Uuid;

pub type Id = String;

/// A JSON object as stored in or read from the document store.
pub type Record = Map<String, Value>;

pub fn generate_id() -> Id {
    Uuid::new_v4().to_string()
}

/// Current local time, second precision with a numeric offset
/// (`2026-10-16T12:04:05+02:00`).
pub fn current_timestamp() -> String {
    Local::now().to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// JavaScript-style truthiness for stored field values.
///
/// `null`, `false`, `0`, `NaN` and `""` are falsy; every array and object,
/// empty or not, is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Moves the store's `_id`/`_rev` keys to `id`/`rev`.
pub fn remap_store_keys(record: &mut Record) {
    if let Some(id) = record.remove("_id") {
        record.insert("id".to_string(), id);
    }
    if let Some(rev) = record.remove("_rev") {
        record.insert("rev".to_string(), rev);
    }
}
