//! Topic: a discussion thread filed under a category.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, category::Category, user::User};

/// Minimum title length, in characters, after trimming.
pub const MIN_TITLE_LEN: usize = 3;

/// Maximum number of topics returned by one listing call.
pub const PAGE_SIZE: usize = 50;

/// Short segments of this many characters or fewer are never looked up.
const MIN_SHORT_SEGMENT_LEN: usize = 5;

// ─── Topic ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
  pub topic_id:       Uuid,
  /// `None` only for legacy rows that predate short ids and have not yet
  /// been visited by the backfill sweep.
  pub short_id:       Option<String>,
  pub title:          String,
  pub body:           String,
  /// Maintained by the comments subsystem.
  pub comments_count: i64,
  pub category_id:    Uuid,
  /// The author; never changes after creation.
  pub user_id:        Uuid,
  /// Ranking signal, maintained elsewhere.
  pub score:          i64,
  pub created_at:     DateTime<Utc>,
  pub updated_at:     DateTime<Utc>,

  /// Populated on read; never persisted.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub user:     Option<User>,
  /// Populated on read; never persisted.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub category: Option<Category>,
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Input to [`crate::store::TopicStore::create_topic`].
#[derive(Debug, Clone)]
pub struct NewTopic {
  pub title:       String,
  pub body:        String,
  pub category_id: Uuid,
}

impl NewTopic {
  pub fn new(
    title: impl Into<String>,
    body: impl Into<String>,
    category_id: Uuid,
  ) -> Self {
    Self {
      title: title.into(),
      body: body.into(),
      category_id,
    }
  }

  /// Trim both fields and enforce the title length.
  pub fn normalized(self) -> Result<Self> {
    let title = self.title.trim().to_owned();
    check_title(&title)?;
    Ok(Self {
      title,
      body: self.body.trim().to_owned(),
      category_id: self.category_id,
    })
  }
}

/// Input to [`crate::store::TopicStore::update_topic`].
///
/// An empty `title` leaves the stored title alone, while `body` always
/// replaces the stored body, even when empty. A `category_id` of `None`
/// keeps the current category.
#[derive(Debug, Clone, Default)]
pub struct TopicChanges {
  pub title:       String,
  pub body:        String,
  pub category_id: Option<Uuid>,
}

impl TopicChanges {
  /// Trim both fields; a non-empty title must still meet the minimum.
  pub fn normalized(self) -> Result<Self> {
    let title = self.title.trim().to_owned();
    if !title.is_empty() {
      check_title(&title)?;
    }
    Ok(Self {
      title,
      body: self.body.trim().to_owned(),
      category_id: self.category_id,
    })
  }

  /// Apply these changes to `topic`, returning the previous category id if
  /// the category changed. The new category must already be resolved by
  /// the caller.
  pub fn apply(&self, topic: &mut Topic) -> Option<Uuid> {
    if !self.title.is_empty() {
      topic.title.clone_from(&self.title);
    }
    topic.body.clone_from(&self.body);
    match self.category_id {
      Some(id) if id != topic.category_id => {
        Some(std::mem::replace(&mut topic.category_id, id))
      }
      _ => None,
    }
  }
}

fn check_title(title: &str) -> Result<()> {
  if title.chars().count() < MIN_TITLE_LEN {
    return Err(Error::TitleTooShort { min: MIN_TITLE_LEN });
  }
  Ok(())
}

// ─── Composite ids ───────────────────────────────────────────────────────────

/// Extract the short id from a `shortid-slug` path segment.
///
/// Returns `None` when the leading segment is too short to be a short id,
/// in which case no lookup should be attempted.
pub fn short_segment(id: &str) -> Option<&str> {
  let head = id.split('-').next()?;
  (head.chars().count() > MIN_SHORT_SEGMENT_LEN).then_some(head)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn topic() -> Topic {
    let now = Utc::now();
    Topic {
      topic_id:       Uuid::new_v4(),
      short_id:       Some("bcdefgh".into()),
      title:          "Original".into(),
      body:           "original body".into(),
      comments_count: 0,
      category_id:    Uuid::new_v4(),
      user_id:        Uuid::new_v4(),
      score:          0,
      created_at:     now,
      updated_at:     now,
      user:           None,
      category:       None,
    }
  }

  #[test]
  fn new_topic_is_trimmed() {
    let input = NewTopic::new(" Gophers ", "  body\n", Uuid::new_v4())
      .normalized()
      .unwrap();
    assert_eq!(input.title, "Gophers");
    assert_eq!(input.body, "body");
  }

  #[test]
  fn title_length_counts_characters_not_bytes() {
    assert!(NewTopic::new("héé", "", Uuid::new_v4()).normalized().is_ok());
    let err = NewTopic::new("  ab  ", "", Uuid::new_v4())
      .normalized()
      .unwrap_err();
    assert!(matches!(err, Error::TitleTooShort { min: 3 }));
  }

  #[test]
  fn empty_title_change_keeps_title_but_clears_body() {
    let mut t = topic();
    let changes = TopicChanges::default().normalized().unwrap();
    assert_eq!(changes.apply(&mut t), None);
    assert_eq!(t.title, "Original");
    assert_eq!(t.body, "");
  }

  #[test]
  fn short_non_empty_title_change_is_rejected() {
    let changes = TopicChanges {
      title: " x ".into(),
      ..TopicChanges::default()
    };
    assert!(changes.normalized().is_err());
  }

  #[test]
  fn category_change_reports_previous_category() {
    let mut t = topic();
    let before = t.category_id;
    let after = Uuid::new_v4();

    let same = TopicChanges {
      category_id: Some(before),
      ..TopicChanges::default()
    };
    assert_eq!(same.apply(&mut t), None);

    let moved = TopicChanges {
      category_id: Some(after),
      ..TopicChanges::default()
    };
    assert_eq!(moved.apply(&mut t), Some(before));
    assert_eq!(t.category_id, after);
  }

  #[test]
  fn short_segment_requires_more_than_five_characters() {
    assert_eq!(short_segment("bcdefgh-hello-world"), Some("bcdefgh"));
    assert_eq!(short_segment("bcdefgh"), Some("bcdefgh"));
    assert_eq!(short_segment("bcdef-hello"), None);
    assert_eq!(short_segment(""), None);
  }

  #[test]
  fn unpopulated_associations_are_omitted_from_json() {
    let json = serde_json::to_value(topic()).unwrap();
    assert!(json.get("user").is_none());
    assert!(json.get("category").is_none());
    assert_eq!(json["short_id"], "bcdefgh");

    let back: Topic = serde_json::from_value(json).unwrap();
    assert!(back.user.is_none());
    assert!(back.category.is_none());
  }
}
