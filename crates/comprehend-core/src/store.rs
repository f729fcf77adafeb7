//! The `EntityStore` trait: everything the pipeline needs from the database.
//!
//! Implemented by storage backends (e.g. `comprehend-store-sqlite`).

use std::future::Future;

use crate::{
  entity::DetectedEntity,
  job::{Job, JobSpec},
  key::PrimaryKey,
};

/// One pending source row.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow {
  /// Paging cursor (`rowid`) when the table has one.
  pub position: Option<i64>,
  pub key:      PrimaryKey,
  /// Requested column values, in requested order, rendered as text.
  pub values:   Vec<Option<String>>,
}

/// The extraction outcome for one source row, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct RowEntities {
  pub key:      PrimaryKey,
  pub entities: Vec<DetectedEntity>,
}

/// Abstraction over the relational store holding both source rows and
/// extraction results.
pub trait EntityStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Validate `spec` against the database and make sure the dictionary,
  /// result and checkpoint tables exist, dropping them first when
  /// `spec.reset` is set. No rows are read.
  fn prepare(&self, spec: JobSpec) -> impl Future<Output = Result<Job, Self::Error>> + Send + '_;

  /// Number of rows not yet checkpointed that match the job's filter.
  fn count_pending<'a>(
    &'a self,
    job: &'a Job,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  /// Up to `limit` pending rows, continuing after `after` (a previous row's
  /// [`SourceRow::position`]) when given.
  fn next_pending<'a>(
    &'a self,
    job: &'a Job,
    after: Option<i64>,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<SourceRow>, Self::Error>> + Send + 'a;

  /// Normalise and persist one chunk: resolve dictionary ids, append result
  /// rows, and checkpoint every row of the chunk, as one unit.
  fn write_chunk<'a>(
    &'a self,
    job: &'a Job,
    rows: Vec<RowEntities>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
