//! Error type for `fia-store-sqlite`.

use rusqlite::ErrorCode;
use thiserror::Error;

/// Coarse classification of an [`Error`], for callers deciding whether to
/// re-resolve and retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  InvalidArgument,
  NotFound,
  DataInconsistency,
  /// A uniqueness, foreign-key or check constraint rejected the write. The
  /// unit of work was rolled back; resolving again is expected to succeed.
  ConstraintViolation,
  Storage,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] fia_core::Error),

  #[error("constraint violation: {0}")]
  ConstraintViolation(String),

  #[error("database error: {0}")]
  Database(tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    use fia_core::Error as Core;

    match self {
      Self::Core(Core::InvalidArgument(_)) => ErrorKind::InvalidArgument,
      Self::Core(e) if e.is_not_found() => ErrorKind::NotFound,
      Self::Core(
        Core::DataInconsistency(_)
        | Core::UnknownState(_)
        | Core::UnknownJobType(_),
      ) => ErrorKind::DataInconsistency,
      Self::ConstraintViolation(_) => ErrorKind::ConstraintViolation,
      _ => ErrorKind::Storage,
    }
  }
}

impl From<rusqlite::Error> for Error {
  fn from(err: rusqlite::Error) -> Self {
    match err {
      rusqlite::Error::SqliteFailure(failure, message)
        if failure.code == ErrorCode::ConstraintViolation =>
      {
        Self::ConstraintViolation(
          message.unwrap_or_else(|| failure.to_string()),
        )
      }
      other => Self::Database(tokio_rusqlite::Error::Rusqlite(other)),
    }
  }
}

impl From<tokio_rusqlite::Error> for Error {
  fn from(err: tokio_rusqlite::Error) -> Self {
    match err {
      tokio_rusqlite::Error::Rusqlite(e) => e.into(),
      // Domain failures raised inside a connection closure travel as `Other`.
      tokio_rusqlite::Error::Other(boxed) => match boxed.downcast::<Self>() {
        Ok(inner) => *inner,
        Err(other) => Self::Database(tokio_rusqlite::Error::Other(other)),
      },
      other => Self::Database(other),
    }
  }
}

/// Abort a connection closure with a domain error. The surrounding
/// transaction is dropped uncommitted and therefore rolled back.
pub(crate) fn abort(err: impl Into<Error>) -> tokio_rusqlite::Error {
  tokio_rusqlite::Error::Other(Box::new(err.into()))
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
