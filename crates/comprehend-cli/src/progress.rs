//! Terminal progress for a run.

use comprehend_core::{
  entity::DocumentError,
  job::Job,
  key::PrimaryKey,
  pipeline::{Progress, RunSummary},
};
use indicatif::{ProgressBar, ProgressStyle};

/// One stderr line per failed document: `<key json>: Error: <error json>`.
pub fn error_line(key: &PrimaryKey, error: &DocumentError) -> String {
  let payload = serde_json::to_string(error).unwrap_or_else(|_| error.error_message.clone());
  format!("{key}: Error: {payload}")
}

/// Row-count progress bar on stderr; indicatif hides it when stderr is not a
/// terminal.
pub struct ProgressReporter {
  bar: ProgressBar,
}

impl ProgressReporter {
  pub fn new() -> Self {
    let bar = ProgressBar::new(0);
    bar.set_style(
      ProgressStyle::with_template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░"),
    );
    Self { bar }
  }
}

impl Progress for ProgressReporter {
  fn started(&mut self, job: &Job, pending: u64) {
    self.bar.set_length(pending);
    self.bar.set_message(job.output_table.clone());
  }

  fn document_failed(&mut self, key: &PrimaryKey, error: &DocumentError) {
    let line = error_line(key, error);
    self.bar.suspend(|| eprintln!("{line}"));
  }

  fn chunk_written(&mut self, rows: usize) { self.bar.inc(rows as u64); }

  fn finished(&mut self, _summary: &RunSummary) { self.bar.finish_and_clear(); }
}
