//! The `TopicStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `agora-store-sqlite`).
//! Request handlers and maintenance tools depend on this abstraction, not on
//! any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  category::Category,
  topic::{NewTopic, Topic, TopicChanges},
  user::User,
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Which topics [`TopicStore::list_topics`] pages through.
#[derive(Debug, Clone, Copy)]
pub enum TopicScope<'a> {
  /// Every topic on the board.
  All,
  /// Topics written by this user. The user is attached to every row as-is.
  User(&'a User),
  /// Topics filed under this category. The category is attached as-is.
  Category(&'a Category),
}

/// Result of one page of [`TopicStore::backfill_short_ids`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backfill {
  /// Rows visited, whether or not they needed a short id.
  pub scanned:  u64,
  /// Rows that were given a short id.
  pub assigned: u64,
  /// `created_at` of the oldest row visited, or the offset if none were.
  /// Pass it back as the next offset to continue into older history.
  pub last:     DateTime<Utc>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over an Agora topic store backend.
///
/// Validation, authorization and not-found failures surface as
/// [`crate::Error`] values inside `Self::Error`, unchanged; everything else
/// is a storage failure.
pub trait TopicStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Create a topic written by `author`.
  ///
  /// Updates the category's `topics_count` and `last_topic_id` and the
  /// global `topics` statistic in the same transaction. The returned topic
  /// carries no associations.
  fn create_topic<'a>(
    &'a self,
    author: &'a User,
    input: NewTopic,
  ) -> impl Future<Output = Result<Topic, Self::Error>> + Send + 'a;

  /// Edit a topic's title, body and category on behalf of `actor`.
  ///
  /// Only the author or an admin may edit. When the category changes, both
  /// the old and new category are queued for aggregate recomputation once
  /// the edit has committed.
  fn update_topic<'a>(
    &'a self,
    actor: &'a User,
    topic_id: Uuid,
    changes: TopicChanges,
  ) -> impl Future<Output = Result<Topic, Self::Error>> + Send + 'a;

  /// Look up a topic by UUID, falling back to the `shortid-slug` form.
  /// Returns `None` if neither matches.
  fn read_topic<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<Option<Topic>, Self::Error>> + Send + 'a;

  /// Look up a topic by the short id at the head of a `shortid-slug`.
  fn read_topic_by_short_id<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<Option<Topic>, Self::Error>> + Send + 'a;

  /// Return at most [`crate::topic::PAGE_SIZE`] topics created strictly
  /// before `offset` (default: now), newest first.
  fn list_topics<'a>(
    &'a self,
    scope: TopicScope<'a>,
    offset: Option<DateTime<Utc>>,
  ) -> impl Future<Output = Result<Vec<Topic>, Self::Error>> + Send + 'a;

  /// Give a short id to every topic in one page of history that lacks one.
  ///
  /// Rows that already have a short id are never modified, so running the
  /// same page twice is harmless.
  fn backfill_short_ids(
    &self,
    offset: Option<DateTime<Utc>>,
    limit: u32,
  ) -> impl Future<Output = Result<Backfill, Self::Error>> + Send + '_;
}
