//! Error types for `fia-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The caller did not supply enough data to resolve an identity.
  #[error("invalid argument: {0}")]
  InvalidArgument(String),

  #[error("job not found: {0}")]
  JobNotFound(i64),

  #[error("run not found: {0}")]
  RunNotFound(i64),

  #[error("instrument not found: {0:?}")]
  InstrumentNotFound(String),

  /// Stored data contradicts an invariant the caller relies on.
  #[error("database is not consistent with expected behaviour: {0}")]
  DataInconsistency(String),

  #[error("unknown job state: {0:?}")]
  UnknownState(String),

  #[error("unknown job type: {0:?}")]
  UnknownJobType(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  /// Whether the error refers to a row that does not exist.
  pub fn is_not_found(&self) -> bool {
    matches!(
      self,
      Self::JobNotFound(_) | Self::RunNotFound(_) | Self::InstrumentNotFound(_)
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
