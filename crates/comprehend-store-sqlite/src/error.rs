//! Error type for `comprehend-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] comprehend_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("table {0} does not exist")]
  TableNotFound(String),

  #[error("table {table} does not have columns: {}", missing.join(", "))]
  MissingColumns { table: String, missing: Vec<String> },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
