//! [`SqliteStore`]: the SQLite implementation of [`EntityStore`].

use std::path::Path;

use comprehend_core::{
  Error as CoreError,
  entity::DetectedEntity,
  job::{Job, JobSpec, check_reserved, param_name},
  key::{KeyColumn, PrimaryKey},
  store::{EntityStore, RowEntities, SourceRow},
};
use rusqlite::{Connection, OptionalExtension as _, Row, Statement, types::Value};
use tracing::{debug, info};

use crate::{
  Error, Result,
  encode::{decode_key_value, decode_text, encode_key_value},
  schema,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// Source rows and extraction results in a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

/// A column as reported by `pragma_table_info`.
struct ColumnInfo {
  name:      String,
  decl_type: String,
  /// 1-based position within the primary key, 0 when not part of it.
  pk:        i64,
}

struct TableInfo {
  columns:       Vec<ColumnInfo>,
  without_rowid: bool,
}

impl SqliteStore {
  /// Open an existing database file (or create one) at `path`.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init().await?;
    Ok(store)
  }

  async fn init(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn inspect_table(&self, table: &str) -> Result<Option<TableInfo>> {
    let table = table.to_owned();

    let info = self
      .conn
      .call(move |conn| {
        let without_rowid: Option<bool> = conn
          .query_row(
            "SELECT wr FROM pragma_table_list
             WHERE schema = 'main' AND type = 'table' AND name = ?1 COLLATE NOCASE",
            rusqlite::params![table],
            |row| row.get(0),
          )
          .optional()?;

        let Some(without_rowid) = without_rowid else {
          return Ok(None);
        };

        let mut stmt =
          conn.prepare("SELECT name, type, pk FROM pragma_table_info(?1) ORDER BY cid")?;
        let columns = stmt
          .query_map(rusqlite::params![table], |row| {
            Ok(ColumnInfo {
              name:      row.get(0)?,
              decl_type: row.get(1)?,
              pk:        row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Some(TableInfo { columns, without_rowid }))
      })
      .await?;

    Ok(info)
  }
}

// ─── Dictionary upserts ──────────────────────────────────────────────────────

pub(crate) fn upsert_entity_type(conn: &Connection, value: &str) -> rusqlite::Result<i64> {
  conn
    .prepare_cached(schema::LOOKUP_ENTITY_TYPE)?
    .query_row(rusqlite::params![value], |row| row.get(0))
}

pub(crate) fn upsert_entity(conn: &Connection, type_id: i64, name: &str) -> rusqlite::Result<i64> {
  conn
    .prepare_cached(schema::LOOKUP_ENTITY)?
    .query_row(rusqlite::params![type_id, name], |row| row.get(0))
}

/// Key values followed by the entity's result columns.
fn result_values(
  conn: &Connection,
  key: &PrimaryKey,
  entity: &DetectedEntity,
) -> rusqlite::Result<Vec<Value>> {
  let type_id = upsert_entity_type(conn, &entity.entity_type)?;
  let entity_id = upsert_entity(conn, type_id, &entity.text)?;

  let mut values: Vec<Value> = key.values().map(encode_key_value).collect();
  values.extend([
    Value::Real(entity.score),
    Value::Integer(entity_id),
    Value::Integer(entity.begin_offset),
    Value::Integer(entity.end_offset),
  ]);
  Ok(values)
}

/// Resolve the key layout of a source table; tables without a declared
/// primary key are addressed by `rowid`.
fn key_columns(info: &TableInfo) -> Vec<KeyColumn> {
  let mut keys: Vec<&ColumnInfo> = info.columns.iter().filter(|c| c.pk > 0).collect();
  keys.sort_by_key(|c| c.pk);

  if keys.is_empty() {
    return vec![KeyColumn { name: "rowid".into(), decl_type: "INTEGER".into() }];
  }
  keys
    .into_iter()
    .map(|c| KeyColumn { name: c.name.clone(), decl_type: c.decl_type.clone() })
    .collect()
}

/// `--where` parameters in SQLite's `:name` form.
fn named_params(params: &[(String, String)]) -> Vec<(String, String)> {
  params.iter().map(|(name, value)| (param_name(name), value.clone())).collect()
}

/// Bind the parameters `stmt` refers to. Supplied parameters the statement
/// never mentions are ignored.
fn bind_params(stmt: &mut Statement<'_>, params: &[(String, String)]) -> rusqlite::Result<()> {
  for (name, value) in params {
    if let Some(index) = stmt.parameter_index(name)? {
      stmt.raw_bind_parameter(index, value)?;
    }
  }
  Ok(())
}

/// Decode one row of [`schema::select_pending`].
fn source_row(row: &Row<'_>, key_columns: &[KeyColumn], text_count: usize) -> rusqlite::Result<SourceRow> {
  let position: Option<i64> = row.get(0)?;

  let mut key = Vec::with_capacity(key_columns.len());
  for (i, column) in key_columns.iter().enumerate() {
    let value: Value = row.get(1 + i)?;
    key.push((column.name.clone(), decode_key_value(value)));
  }

  let offset = 1 + key_columns.len();
  let values = (0..text_count)
    .map(|j| row.get::<_, Value>(offset + j).map(decode_text))
    .collect::<rusqlite::Result<Vec<_>>>()?;

  Ok(SourceRow { position, key: PrimaryKey(key), values })
}

// ─── EntityStore impl ────────────────────────────────────────────────────────

impl EntityStore for SqliteStore {
  type Error = Error;

  async fn prepare(&self, spec: JobSpec) -> Result<Job> {
    if spec.columns.is_empty() {
      return Err(CoreError::NoColumns.into());
    }

    let info = self
      .inspect_table(&spec.table)
      .await?
      .ok_or_else(|| Error::TableNotFound(spec.table.clone()))?;

    let missing: Vec<String> = spec
      .columns
      .iter()
      .filter(|wanted| !info.columns.iter().any(|c| c.name.eq_ignore_ascii_case(wanted)))
      .cloned()
      .collect();
    if !missing.is_empty() {
      return Err(Error::MissingColumns { table: spec.table.clone(), missing });
    }

    let key_columns = key_columns(&info);
    check_reserved(&key_columns)?;

    let job = Job {
      output_table: spec.output_table(),
      done_table: spec.done_table(),
      has_rowid: !info.without_rowid,
      key_columns,
      spec,
    };

    if job.spec.reset {
      info!(output = %job.output_table, done = %job.done_table, "resetting extraction state");
    }

    let reset = job.spec.reset;
    let drop_sql = schema::drop_tables(&job.output_table, &job.done_table);
    let create_sql = format!(
      "{}\n{};\n{};",
      schema::DICTIONARY_SCHEMA,
      schema::create_output_table(&job),
      schema::create_done_table(&job)
    );

    self
      .conn
      .call(move |conn| {
        if reset {
          // Other result tables may still reference the dictionaries.
          conn.execute_batch("PRAGMA foreign_keys = OFF;")?;
          let dropped = conn.execute_batch(&drop_sql);
          conn.execute_batch("PRAGMA foreign_keys = ON;")?;
          dropped?;
        }
        conn.execute_batch(&create_sql)?;
        Ok(())
      })
      .await?;

    debug!(output = %job.output_table, keys = job.key_columns.len(), "schema ready");
    Ok(job)
  }

  async fn count_pending(&self, job: &Job) -> Result<u64> {
    let sql = schema::count_pending(job);
    let params = named_params(&job.spec.params);

    let count: i64 = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        bind_params(&mut stmt, &params)?;
        let mut rows = stmt.raw_query();
        let row = rows.next()?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        Ok(row.get(0)?)
      })
      .await?;

    Ok(count.max(0) as u64)
  }

  async fn next_pending(&self, job: &Job, after: Option<i64>, limit: usize) -> Result<Vec<SourceRow>> {
    let sql = schema::select_pending(job, after, limit);
    let params = named_params(&job.spec.params);
    let key_columns = job.key_columns.clone();
    let text_count = job.spec.columns.len();

    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        bind_params(&mut stmt, &params)?;

        let mut rows = stmt.raw_query();
        let mut pending = Vec::new();
        while let Some(row) = rows.next()? {
          pending.push(source_row(row, &key_columns, text_count)?);
        }
        Ok(pending)
      })
      .await?;

    Ok(rows)
  }

  async fn write_chunk(&self, job: &Job, rows: Vec<RowEntities>) -> Result<()> {
    let insert_result = schema::insert_result(job);
    let insert_done = schema::insert_done(job);

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut results = Vec::new();
          for row in &rows {
            for entity in &row.entities {
              results.push(result_values(&tx, &row.key, entity)?);
            }
          }

          let mut stmt = tx.prepare(&insert_result)?;
          for values in results {
            stmt.execute(rusqlite::params_from_iter(values))?;
          }

          let mut stmt = tx.prepare(&insert_done)?;
          for row in &rows {
            stmt.execute(rusqlite::params_from_iter(row.key.values().map(encode_key_value)))?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;

    Ok(())
  }
}
