//! Error type for `fia-updater`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The line was not a well-formed event.
  #[error("decode error: {0}")]
  Decode(#[from] serde_json::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}
