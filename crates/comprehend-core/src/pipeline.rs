//! The extraction run: select → batch → prepare → extract → write, one chunk
//! at a time.
//!
//! Chunks are strictly sequential. A chunk is fetched only after the previous
//! one has been written and checkpointed, so at most one chunk of rows is held
//! in memory and an interrupted run resumes at the first unwritten chunk.

use tracing::{debug, info};

use crate::{
  BATCH_SIZE, Error, LANGUAGE_CODE, Result,
  entity::{DocumentError, DocumentOutcome},
  extractor::EntityExtractor,
  job::{Job, JobSpec},
  key::PrimaryKey,
  store::{EntityStore, RowEntities},
  text::prepare_text,
};

/// Counters for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
  pub chunks:           usize,
  pub rows_processed:   usize,
  pub entities_written: usize,
  pub documents_failed: usize,
}

/// Observer for run progress. All methods default to doing nothing.
pub trait Progress {
  fn started(&mut self, _job: &Job, _pending: u64) {}

  fn document_failed(&mut self, _key: &PrimaryKey, _error: &DocumentError) {}

  fn chunk_written(&mut self, _rows: usize) {}

  fn finished(&mut self, _summary: &RunSummary) {}
}

impl Progress for () {}

/// Run every pending row of `spec` through `extractor`, persisting results in
/// `store`.
pub async fn run<S, X, P>(
  store: &S,
  extractor: &X,
  spec: JobSpec,
  progress: &mut P,
) -> Result<RunSummary>
where
  S: EntityStore,
  X: EntityExtractor,
  P: Progress + ?Sized,
{
  let job = store.prepare(spec).await.map_err(Error::store)?;
  let pending = store.count_pending(&job).await.map_err(Error::store)?;

  info!(
    table = %job.spec.table,
    output = %job.output_table,
    pending,
    "starting entity extraction"
  );
  progress.started(&job, pending);

  let mut summary = RunSummary::default();
  let mut after = None;

  loop {
    let rows = store
      .next_pending(&job, after, BATCH_SIZE)
      .await
      .map_err(Error::store)?;
    if rows.is_empty() {
      break;
    }
    after = rows.last().and_then(|r| r.position);

    let texts: Vec<String> = rows
      .iter()
      .map(|row| prepare_text(&row.values, job.spec.text))
      .collect();

    let mut outcome = extractor
      .detect_entities(&texts, LANGUAGE_CODE)
      .await
      .map_err(Error::extraction)?
      .into_outcome();

    let mut chunk = Vec::with_capacity(rows.len());
    for (index, row) in rows.into_iter().enumerate() {
      let entities = match outcome.take(index) {
        DocumentOutcome::Entities(entities) => entities,
        DocumentOutcome::Failed(error) => {
          info!(
            key = %row.key,
            code = %error.error_code,
            message = %error.error_message,
            "document failed"
          );
          progress.document_failed(&row.key, &error);
          summary.documents_failed += 1;
          Vec::new()
        }
        DocumentOutcome::Missing => {
          debug!(key = %row.key, "no result returned for document");
          Vec::new()
        }
      };
      summary.entities_written += entities.len();
      chunk.push(RowEntities { key: row.key, entities });
    }

    let written = chunk.len();
    store.write_chunk(&job, chunk).await.map_err(Error::store)?;

    summary.chunks += 1;
    summary.rows_processed += written;
    debug!(chunk = summary.chunks, rows = written, "chunk written");
    progress.chunk_written(written);
  }

  info!(
    rows = summary.rows_processed,
    entities = summary.entities_written,
    failed = summary.documents_failed,
    "entity extraction finished"
  );
  progress.finished(&summary);
  Ok(summary)
}
