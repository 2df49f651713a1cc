//! Error types for `agora-core`.

use thiserror::Error;
use uuid::Uuid;

/// Coarse classification callers use to map a failure onto a response,
/// without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  /// The input was rejected: short title, unknown category reference.
  Validation,
  /// The actor may not perform the mutation.
  Authorization,
  /// The target of a mutation does not exist.
  NotFound,
  /// An internal invariant failed outside the database.
  Server,
  /// The underlying storage failed.
  Transaction,
}

#[derive(Debug, Clone, Error)]
pub enum Error {
  #[error("title must be at least {min} characters")]
  TitleTooShort { min: usize },

  #[error("category not found: {0}")]
  CategoryNotFound(Uuid),

  #[error("user {user} may not modify topic {topic}")]
  Forbidden { user: Uuid, topic: Uuid },

  #[error("topic not found: {0}")]
  TopicNotFound(Uuid),

  #[error("timestamp cannot be encoded as a short id: {0}")]
  InvalidTimestamp(String),

  #[error("malformed short id: {0:?}")]
  InvalidShortId(String),

  #[error("short id codec unavailable: {0}")]
  ShortIdCodec(String),
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::TitleTooShort { .. } | Self::CategoryNotFound(_) => {
        ErrorKind::Validation
      }
      Self::Forbidden { .. } => ErrorKind::Authorization,
      Self::TopicNotFound(_) => ErrorKind::NotFound,
      Self::InvalidTimestamp(_) | Self::InvalidShortId(_) | Self::ShortIdCodec(_) => {
        ErrorKind::Server
      }
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
