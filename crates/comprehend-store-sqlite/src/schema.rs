//! SQL text for the dictionary, result and checkpoint tables, and for the
//! per-job queries built from user-supplied table and column names.

use comprehend_core::job::{ENTITIES_TABLE, ENTITY_TYPES_TABLE, Job};

/// Shared dictionaries; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const DICTIONARY_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS comprehend_entity_types (
    id    INTEGER PRIMARY KEY,
    value TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS comprehend_entities (
    id   INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    type INTEGER NOT NULL REFERENCES comprehend_entity_types(id),
    UNIQUE (type, name)
);
";

/// Upsert returning the id of the (possibly pre-existing) row, so lookups
/// never race a separate existence check.
pub const LOOKUP_ENTITY_TYPE: &str = "
INSERT INTO comprehend_entity_types (value) VALUES (?1)
ON CONFLICT (value) DO UPDATE SET value = excluded.value
RETURNING id";

pub const LOOKUP_ENTITY: &str = "
INSERT INTO comprehend_entities (type, name) VALUES (?1, ?2)
ON CONFLICT (type, name) DO UPDATE SET name = excluded.name
RETURNING id";

/// Quote an identifier for interpolation into SQL.
pub fn ident(name: &str) -> String { format!("\"{}\"", name.replace('"', "\"\"")) }

fn key_list(job: &Job) -> String {
  job
    .key_columns
    .iter()
    .map(|c| ident(&c.name))
    .collect::<Vec<_>>()
    .join(", ")
}

fn key_defs(job: &Job) -> Vec<String> {
  job
    .key_columns
    .iter()
    .map(|c| {
      if c.decl_type.is_empty() {
        ident(&c.name)
      } else {
        format!("{} {}", ident(&c.name), c.decl_type)
      }
    })
    .collect()
}

fn source_reference(job: &Job) -> Option<String> {
  job.references_source().then(|| {
    let key = ident(&job.key_columns[0].name);
    format!("FOREIGN KEY ({key}) REFERENCES {}({key})", ident(&job.spec.table))
  })
}

// ─── DDL ──────────────────────────────────────────────────────────────────────

pub fn create_output_table(job: &Job) -> String {
  let mut defs = key_defs(job);
  defs.extend([
    "score FLOAT".to_owned(),
    format!("entity INTEGER REFERENCES {ENTITIES_TABLE}(id)"),
    "begin_offset INTEGER".to_owned(),
    "end_offset INTEGER".to_owned(),
  ]);
  defs.extend(source_reference(job));
  format!(
    "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
    ident(&job.output_table),
    defs.join(",\n    ")
  )
}

pub fn create_done_table(job: &Job) -> String {
  let mut defs = key_defs(job);
  defs.push(format!("PRIMARY KEY ({})", key_list(job)));
  defs.extend(source_reference(job));
  format!(
    "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
    ident(&job.done_table),
    defs.join(",\n    ")
  )
}

/// Drops children before parents.
pub fn drop_tables(output_table: &str, done_table: &str) -> String {
  [output_table, done_table, ENTITIES_TABLE, ENTITY_TYPES_TABLE]
    .iter()
    .map(|t| format!("DROP TABLE IF EXISTS {};", ident(t)))
    .collect::<Vec<_>>()
    .join("\n")
}

// ─── Row selection ────────────────────────────────────────────────────────────

/// `WHERE` body shared by the row query and the count query: not yet in the
/// done table, and matching the user filter.
fn pending_predicate(job: &Job) -> String {
  let source = ident(&job.spec.table);
  let done = ident(&job.done_table);
  let matches = job
    .key_columns
    .iter()
    .map(|c| {
      let col = ident(&c.name);
      format!("{done}.{col} IS {source}.{col}")
    })
    .collect::<Vec<_>>()
    .join(" AND ");

  let mut predicate = format!("NOT EXISTS (SELECT 1 FROM {done} WHERE {matches})");
  if let Some(filter) = &job.spec.filter {
    predicate.push_str(&format!(" AND ({filter})"));
  }
  predicate
}

/// Key columns then requested columns, all qualified by the source table.
fn projection(job: &Job) -> String {
  let source = ident(&job.spec.table);
  job
    .key_columns
    .iter()
    .map(|c| c.name.as_str())
    .chain(job.spec.columns.iter().map(String::as_str))
    .map(|name| format!("{source}.{}", ident(name)))
    .collect::<Vec<_>>()
    .join(", ")
}

pub fn count_pending(job: &Job) -> String {
  format!(
    "WITH pending AS (SELECT {} FROM {} WHERE {}) SELECT count(*) FROM pending",
    projection(job),
    ident(&job.spec.table),
    pending_predicate(job)
  )
}

/// Selects `rowid` (or `NULL`) first, then the projection.
pub fn select_pending(job: &Job, after: Option<i64>, limit: usize) -> String {
  let source = ident(&job.spec.table);
  let mut sql = if job.has_rowid {
    format!("SELECT {source}.rowid, {} FROM {source} WHERE {}", projection(job), pending_predicate(job))
  } else {
    format!("SELECT NULL, {} FROM {source} WHERE {}", projection(job), pending_predicate(job))
  };
  if job.has_rowid {
    if let Some(after) = after {
      sql.push_str(&format!(" AND {source}.rowid > {after}"));
    }
    sql.push_str(&format!(" ORDER BY {source}.rowid"));
  }
  sql.push_str(&format!(" LIMIT {limit}"));
  sql
}

// ─── Writes ───────────────────────────────────────────────────────────────────

fn placeholders(n: usize) -> String { vec!["?"; n].join(", ") }

pub fn insert_result(job: &Job) -> String {
  format!(
    "INSERT INTO {} ({}, score, entity, begin_offset, end_offset) VALUES ({})",
    ident(&job.output_table),
    key_list(job),
    placeholders(job.key_columns.len() + 4)
  )
}

pub fn insert_done(job: &Job) -> String {
  format!(
    "INSERT INTO {} ({}) VALUES ({})",
    ident(&job.done_table),
    key_list(job),
    placeholders(job.key_columns.len())
  )
}
