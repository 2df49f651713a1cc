//! Error type for `agora-store-sqlite`.

use agora_core::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// An expected rejection (validation, authorization, not found), passed
  /// through unchanged.
  #[error(transparent)]
  Core(#[from] agora_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A column held a value outside its domain.
  #[error("unexpected value in column {column}: {value:?}")]
  Decode { column: &'static str, value: String },
}

impl Error {
  /// Everything that is not an expected rejection is reported as a
  /// transaction failure.
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::Core(e) => e.kind(),
      Self::Database(_) | Self::Uuid(_) | Self::DateParse(_) | Self::Decode { .. } => {
        ErrorKind::Transaction
      }
    }
  }
}

impl From<rusqlite::Error> for Error {
  fn from(e: rusqlite::Error) -> Self { Self::Database(e.into()) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
