//! The `EntityExtractor` trait: one batched call to the remote service.

use std::future::Future;

use crate::entity::BatchResponse;

pub trait EntityExtractor: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Detect entities in up to [`BATCH_SIZE`](crate::BATCH_SIZE) documents.
  ///
  /// Per-document failures are part of the returned response; `Err` means
  /// the call as a whole failed.
  fn detect_entities<'a>(
    &'a self,
    texts: &'a [String],
    language_code: &'a str,
  ) -> impl Future<Output = Result<BatchResponse, Self::Error>> + Send + 'a;
}
