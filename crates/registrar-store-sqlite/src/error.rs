//! Error type for `registrar-store-sqlite`.

use registrar_core::{Conflict, ErrorKind, NotFound, ValidationErrors};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Validation, conflict or not-found outcome of a registry operation.
  #[error(transparent)]
  Core(#[from] registrar_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  /// A stored column could not be decoded into its domain type.
  #[error("decode error: {0}")]
  Decode(String),
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::Core(e) => e.kind(),
      _ => ErrorKind::Internal,
    }
  }

  /// The domain error, if this is one.
  pub fn core(&self) -> Option<&registrar_core::Error> {
    match self {
      Self::Core(e) => Some(e),
      _ => None,
    }
  }
}

impl From<Conflict> for Error {
  fn from(c: Conflict) -> Self { Self::Core(c.into()) }
}

impl From<NotFound> for Error {
  fn from(n: NotFound) -> Self { Self::Core(n.into()) }
}

impl From<ValidationErrors> for Error {
  fn from(v: ValidationErrors) -> Self { Self::Core(v.into()) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
