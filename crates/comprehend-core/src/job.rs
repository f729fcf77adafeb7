//! What to process ([`JobSpec`]) and the resolved layout a store prepared for
//! it ([`Job`]).

use crate::{
  Error, Result,
  key::KeyColumn,
  text::TextOptions,
};

/// Shared entity-type dictionary table.
pub const ENTITY_TYPES_TABLE: &str = "comprehend_entity_types";

/// Shared entity dictionary table.
pub const ENTITIES_TABLE: &str = "comprehend_entities";

/// Column names the result table uses for its own data. A source primary key
/// may not reuse any of them.
pub const RESERVED_COLUMNS: [&str; 4] = ["score", "entity", "begin_offset", "end_offset"];

/// A caller's request: which table and columns to run, and how.
#[derive(Debug, Clone, Default)]
pub struct JobSpec {
  pub table:   String,
  pub columns: Vec<String>,
  /// SQL boolean expression appended to the row selection.
  pub filter:  Option<String>,
  /// Named parameters for `filter`, `(name, value)`, name with or without a
  /// leading `:`.
  pub params:  Vec<(String, String)>,
  /// Explicit result table name.
  pub output:  Option<String>,
  /// Drop all result, checkpoint and dictionary tables before starting.
  pub reset:   bool,
  pub text:    TextOptions,
}

impl JobSpec {
  pub fn new(table: impl Into<String>, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
    Self {
      table: table.into(),
      columns: columns.into_iter().map(Into::into).collect(),
      ..Self::default()
    }
  }

  /// `<table>_comprehend_entities` unless overridden.
  pub fn output_table(&self) -> String {
    self
      .output
      .clone()
      .unwrap_or_else(|| format!("{}_comprehend_entities", self.table))
  }

  /// Checkpoint table paired with the result table.
  pub fn done_table(&self) -> String { format!("{}_done", self.output_table()) }
}

/// A [`JobSpec`] validated against the database, with the source table's key
/// layout resolved.
#[derive(Debug, Clone)]
pub struct Job {
  pub spec:         JobSpec,
  pub key_columns:  Vec<KeyColumn>,
  pub output_table: String,
  pub done_table:   String,
  /// `true` when rows can be paged by `rowid`.
  pub has_rowid:    bool,
}

impl Job {
  /// Only a single-column key (other than the implicit rowid) gets a
  /// foreign key back to the source table.
  pub fn references_source(&self) -> bool {
    self.key_columns.len() == 1 && !self.key_columns[0].name.eq_ignore_ascii_case("rowid")
  }
}

/// Reject key columns that would collide with result columns.
pub fn check_reserved(key_columns: &[KeyColumn]) -> Result<()> {
  match key_columns
    .iter()
    .find(|c| RESERVED_COLUMNS.iter().any(|r| r.eq_ignore_ascii_case(&c.name)))
  {
    Some(column) => Err(Error::ReservedColumn(column.name.clone())),
    None => Ok(()),
  }
}

/// Normalise a parameter name to SQLite's `:name` form.
pub fn param_name(name: &str) -> String {
  if name.starts_with([':', '@', '$']) { name.to_owned() } else { format!(":{name}") }
}
