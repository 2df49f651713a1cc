//! Category: the board a topic is filed under.
//!
//! `topics_count` and `last_topic_id` are a denormalised cache of an
//! aggregate over `topics`. They are only ever written as a side effect of
//! creating a topic or moving one between categories, and are always
//! recomputed from a count rather than incremented.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
  pub category_id:   Uuid,
  pub name:          String,
  /// URL-friendly unique handle, e.g. `"general"`.
  pub alias:         String,
  pub description:   String,
  pub topics_count:  i64,
  pub last_topic_id: Option<Uuid>,
  /// Display order; lower sorts first.
  pub position:      i64,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

/// Input to `SqliteStore::add_category`.
#[derive(Debug, Clone, Default)]
pub struct NewCategory {
  pub name:        String,
  pub alias:       String,
  pub description: String,
  pub position:    i64,
}

impl NewCategory {
  pub fn new(name: impl Into<String>, alias: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      alias: alias.into(),
      ..Self::default()
    }
  }
}
