//! Primary-key values identifying source rows.
//!
//! Source tables may use any scalar column type for their primary key, and
//! compound keys are allowed, so a key is an ordered list of
//! `(column, value)` pairs rather than a single integer.

use std::fmt;

use serde::{Serialize, Serializer};

/// A single scalar SQL value.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyValue {
  Null,
  Integer(i64),
  Real(f64),
  Text(String),
  Blob(Vec<u8>),
}

impl Serialize for KeyValue {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    match self {
      KeyValue::Null => serializer.serialize_none(),
      KeyValue::Integer(i) => serializer.serialize_i64(*i),
      KeyValue::Real(f) => serializer.serialize_f64(*f),
      KeyValue::Text(s) => serializer.serialize_str(s),
      KeyValue::Blob(b) => serializer.serialize_bytes(b),
    }
  }
}

impl From<i64> for KeyValue {
  fn from(value: i64) -> Self { KeyValue::Integer(value) }
}

impl From<&str> for KeyValue {
  fn from(value: &str) -> Self { KeyValue::Text(value.to_owned()) }
}

/// Column metadata for one primary-key column of the source table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyColumn {
  pub name:      String,
  /// Declared SQL type, copied verbatim onto the result and done tables.
  /// Empty when the source column has no declared type.
  pub decl_type: String,
}

/// The primary key of one source row, in key-column order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PrimaryKey(pub Vec<(String, KeyValue)>);

impl PrimaryKey {
  pub fn values(&self) -> impl Iterator<Item = &KeyValue> {
    self.0.iter().map(|(_, v)| v)
  }

  pub fn get(&self, column: &str) -> Option<&KeyValue> {
    self.0.iter().find(|(c, _)| c == column).map(|(_, v)| v)
  }
}

/// Renders as a JSON object with columns in key order, e.g.
/// `{"id": 1}` or `{"site": "a", "page": 3}`.
impl fmt::Display for PrimaryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("{")?;
    for (i, (column, value)) in self.0.iter().enumerate() {
      if i > 0 {
        f.write_str(", ")?;
      }
      let column = serde_json::to_string(column).map_err(|_| fmt::Error)?;
      let value = serde_json::to_string(value).map_err(|_| fmt::Error)?;
      write!(f, "{column}: {value}")?;
    }
    f.write_str("}")
  }
}
