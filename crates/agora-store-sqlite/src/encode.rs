//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings with nanosecond
//! precision and a `Z` suffix, so comparing the strings compares the
//! instants. UUIDs are stored as hyphenated lowercase strings.

use agora_core::{
  category::Category,
  topic::Topic,
  user::{Role, User},
};
use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Role ────────────────────────────────────────────────────────────────────

pub fn encode_role(r: Role) -> &'static str {
  match r {
    Role::Member => "member",
    Role::Admin => "admin",
  }
}

pub fn decode_role(s: &str) -> Result<Role> {
  match s {
    "member" => Ok(Role::Member),
    "admin" => Ok(Role::Admin),
    other => Err(Error::Decode { column: "users.role", value: other.to_owned() }),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list shared by every `SELECT` that produces a [`RawTopic`].
pub const TOPIC_COLUMNS: &str = "topic_id, short_id, title, body, comments_count, \
                                 category_id, user_id, score, created_at, updated_at";

/// Raw values read directly from a `topics` row.
#[derive(Debug)]
pub struct RawTopic {
  pub topic_id:       String,
  pub short_id:       Option<String>,
  pub title:          String,
  pub body:           String,
  pub comments_count: i64,
  pub category_id:    String,
  pub user_id:        String,
  pub score:          i64,
  pub created_at:     String,
  pub updated_at:     String,
}

impl RawTopic {
  /// Map a row selected with [`TOPIC_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      topic_id:       row.get(0)?,
      short_id:       row.get(1)?,
      title:          row.get(2)?,
      body:           row.get(3)?,
      comments_count: row.get(4)?,
      category_id:    row.get(5)?,
      user_id:        row.get(6)?,
      score:          row.get(7)?,
      created_at:     row.get(8)?,
      updated_at:     row.get(9)?,
    })
  }

  pub fn from_topic(t: &Topic) -> Self {
    Self {
      topic_id:       encode_uuid(t.topic_id),
      short_id:       t.short_id.clone(),
      title:          t.title.clone(),
      body:           t.body.clone(),
      comments_count: t.comments_count,
      category_id:    encode_uuid(t.category_id),
      user_id:        encode_uuid(t.user_id),
      score:          t.score,
      created_at:     encode_dt(t.created_at),
      updated_at:     encode_dt(t.updated_at),
    }
  }

  pub fn into_topic(self) -> Result<Topic> {
    Ok(Topic {
      topic_id:       decode_uuid(&self.topic_id)?,
      short_id:       self.short_id,
      title:          self.title,
      body:           self.body,
      comments_count: self.comments_count,
      category_id:    decode_uuid(&self.category_id)?,
      user_id:        decode_uuid(&self.user_id)?,
      score:          self.score,
      created_at:     decode_dt(&self.created_at)?,
      updated_at:     decode_dt(&self.updated_at)?,
      user:           None,
      category:       None,
    })
  }
}

pub const USER_COLUMNS: &str = "user_id, username, role, created_at";

/// Raw strings read directly from a `users` row.
#[derive(Debug)]
pub struct RawUser {
  pub user_id:    String,
  pub username:   String,
  pub role:       String,
  pub created_at: String,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:    row.get(0)?,
      username:   row.get(1)?,
      role:       row.get(2)?,
      created_at: row.get(3)?,
    })
  }

  pub fn from_user(u: &User) -> Self {
    Self {
      user_id:    encode_uuid(u.user_id),
      username:   u.username.clone(),
      role:       encode_role(u.role).to_owned(),
      created_at: encode_dt(u.created_at),
    }
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:    decode_uuid(&self.user_id)?,
      username:   self.username,
      role:       decode_role(&self.role)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub const CATEGORY_COLUMNS: &str = "category_id, name, alias, description, topics_count, \
                                    last_topic_id, position, created_at, updated_at";

/// Raw values read directly from a `categories` row.
#[derive(Debug)]
pub struct RawCategory {
  pub category_id:   String,
  pub name:          String,
  pub alias:         String,
  pub description:   String,
  pub topics_count:  i64,
  pub last_topic_id: Option<String>,
  pub position:      i64,
  pub created_at:    String,
  pub updated_at:    String,
}

impl RawCategory {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      category_id:   row.get(0)?,
      name:          row.get(1)?,
      alias:         row.get(2)?,
      description:   row.get(3)?,
      topics_count:  row.get(4)?,
      last_topic_id: row.get(5)?,
      position:      row.get(6)?,
      created_at:    row.get(7)?,
      updated_at:    row.get(8)?,
    })
  }

  pub fn from_category(c: &Category) -> Self {
    Self {
      category_id:   encode_uuid(c.category_id),
      name:          c.name.clone(),
      alias:         c.alias.clone(),
      description:   c.description.clone(),
      topics_count:  c.topics_count,
      last_topic_id: c.last_topic_id.map(encode_uuid),
      position:      c.position,
      created_at:    encode_dt(c.created_at),
      updated_at:    encode_dt(c.updated_at),
    }
  }

  pub fn into_category(self) -> Result<Category> {
    Ok(Category {
      category_id:   decode_uuid(&self.category_id)?,
      name:          self.name,
      alias:         self.alias,
      description:   self.description,
      topics_count:  self.topics_count,
      last_topic_id: self.last_topic_id.as_deref().map(decode_uuid).transpose()?,
      position:      self.position,
      created_at:    decode_dt(&self.created_at)?,
      updated_at:    decode_dt(&self.updated_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, TimeZone};

  use super::*;

  #[test]
  fn encoded_timestamps_sort_like_instants() {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let whole = encode_dt(base);
    let later = encode_dt(base + Duration::nanoseconds(1));
    let much_later = encode_dt(base + Duration::milliseconds(120));

    assert_eq!(whole.len(), later.len());
    assert_eq!(whole.len(), much_later.len());
    assert!(whole < later);
    assert!(later < much_later);
    assert_eq!(decode_dt(&later).unwrap(), base + Duration::nanoseconds(1));
  }

  #[test]
  fn unknown_role_is_a_decode_error() {
    assert!(matches!(
      decode_role("moderator"),
      Err(Error::Decode { column: "users.role", .. })
    ));
  }
}
