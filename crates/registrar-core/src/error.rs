//! Error types for `registrar-core`.
//!
//! The registry reports three kinds of caller-facing failure: malformed input
//! ([`ValidationErrors`]), uniqueness or cardinality collisions ([`Conflict`]),
//! and references to records that do not exist ([`NotFound`]).

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::profile::RoleType;

// ─── Validation ──────────────────────────────────────────────────────────────

/// A single violated field constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
  pub field:   String,
  pub message: String,
}

/// Every constraint an input violated, in the order the fields were checked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
  pub fn new() -> Self { Self::default() }

  /// A report with exactly one violation.
  pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
    let mut errors = Self::new();
    errors.push(field, message);
    errors
  }

  pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
    self.0.push(FieldError {
      field:   field.into(),
      message: message.into(),
    });
  }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn errors(&self) -> &[FieldError] { &self.0 }

  /// Whether any violation was reported against `field`.
  pub fn has(&self, field: &str) -> bool {
    self.0.iter().any(|e| e.field == field)
  }

  /// `Ok(())` when nothing was reported, otherwise the whole report.
  pub fn into_result(self) -> Result<()> {
    if self.is_empty() {
      Ok(())
    } else {
      Err(Error::Validation(self))
    }
  }
}

impl fmt::Display for ValidationErrors {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, e) in self.0.iter().enumerate() {
      if i > 0 {
        f.write_str("; ")?;
      }
      write!(f, "{}: {}", e.field, e.message)?;
    }
    Ok(())
  }
}

// ─── Conflict / NotFound ─────────────────────────────────────────────────────

/// A write collided with an existing record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Conflict {
  #[error("unique_id {0:?} is already assigned")]
  UniqueId(String),

  #[error("personal_email {0:?} is already registered")]
  Email(String),

  #[error("person {unique_id:?} already has a {role} profile")]
  Profile { unique_id: String, role: RoleType },

  #[error("a link from {from:?} to {to:?} already exists")]
  Link { from: String, to: String },
}

/// A referenced record does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotFound {
  #[error("person {0:?}")]
  Person(String),

  #[error("{role} profile for person {unique_id:?}")]
  Profile { unique_id: String, role: RoleType },

  #[error("link from {from:?} to {to:?}")]
  Link { from: String, to: String },
}

// ─── Error ───────────────────────────────────────────────────────────────────

/// Coarse classification used by adapters to pick exit codes or statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  Validation,
  Conflict,
  NotFound,
  Internal,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("validation failed: {0}")]
  Validation(ValidationErrors),

  #[error("conflict: {0}")]
  Conflict(#[from] Conflict),

  #[error("not found: {0}")]
  NotFound(#[from] NotFound),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::Validation(_) => ErrorKind::Validation,
      Self::Conflict(_) => ErrorKind::Conflict,
      Self::NotFound(_) => ErrorKind::NotFound,
      Self::Serialization(_) => ErrorKind::Internal,
    }
  }
}

impl From<ValidationErrors> for Error {
  fn from(errors: ValidationErrors) -> Self { Self::Validation(errors) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
