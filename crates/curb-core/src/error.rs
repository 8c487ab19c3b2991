//! Error types for `curb-core`.
//!
//! Validation and authorization failures are client-caused and surfaced
//! verbatim; `Store` is the only fatal class once an operation is underway.
//! Cache and delivery failures never appear here — they are contained and
//! logged where they occur.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("validation failed: {0}")]
  Validation(String),

  #[error("not authorized: {0}")]
  Authorization(String),

  #[error("report not found: {0}")]
  ReportNotFound(String),

  #[error("no staff account found for {0}")]
  StaffNotFound(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend error as the fatal store-failure class.
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
