//! Error type for `comprehend-aws`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] comprehend_core::Error),

  #[error("invalid endpoint {url}: {reason}")]
  InvalidEndpoint { url: String, reason: String },

  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  /// Non-2xx reply from the service; aborts the run.
  #[error("comprehend returned {code} (HTTP {status}): {message}")]
  Service { status: u16, code: String, message: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
