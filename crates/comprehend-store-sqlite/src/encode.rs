//! Conversions between SQLite values and the core key/text representations.

use comprehend_core::key::KeyValue;
use rusqlite::types::Value;

// ─── Keys ─────────────────────────────────────────────────────────────────────

pub fn decode_key_value(value: Value) -> KeyValue {
  match value {
    Value::Null => KeyValue::Null,
    Value::Integer(i) => KeyValue::Integer(i),
    Value::Real(f) => KeyValue::Real(f),
    Value::Text(s) => KeyValue::Text(s),
    Value::Blob(b) => KeyValue::Blob(b),
  }
}

pub fn encode_key_value(value: &KeyValue) -> Value {
  match value {
    KeyValue::Null => Value::Null,
    KeyValue::Integer(i) => Value::Integer(*i),
    KeyValue::Real(f) => Value::Real(*f),
    KeyValue::Text(s) => Value::Text(s.clone()),
    KeyValue::Blob(b) => Value::Blob(b.clone()),
  }
}

// ─── Text columns ─────────────────────────────────────────────────────────────

/// Render a requested column's value as document text. `NULL` is absent;
/// numbers use their SQL text form; blobs are decoded lossily.
pub fn decode_text(value: Value) -> Option<String> {
  match value {
    Value::Null => None,
    Value::Integer(i) => Some(i.to_string()),
    Value::Real(f) => Some(f.to_string()),
    Value::Text(s) => Some(s),
    Value::Blob(b) => Some(String::from_utf8_lossy(&b).into_owned()),
  }
}
