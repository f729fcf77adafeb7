//! Error types for `comprehend-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A primary-key column shares its name with a result column.
  #[error(
    "primary key column {0:?} clashes with a reserved result column \
     (score, entity, begin_offset, end_offset)"
  )]
  ReservedColumn(String),

  #[error("at least one text column is required")]
  NoColumns,

  #[error("batch of {0} documents exceeds the limit of {max}", max = crate::BATCH_SIZE)]
  TooManyDocuments(usize),

  #[error(transparent)]
  Store(Box<dyn std::error::Error + Send + Sync>),

  #[error(transparent)]
  Extraction(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }

  pub fn extraction(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Extraction(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
