//! Data-access functions.
//!
//! Every function takes the transaction (or connection) it runs on as an
//! explicit argument and returns raw rows; decoding into domain types
//! happens in the caller.

use rusqlite::{
  Connection, ErrorCode, OptionalExtension as _, ToSql, Transaction,
  TransactionBehavior,
};

use crate::{
  Result,
  encode::{
    CATEGORY_COLUMNS, RawCategory, RawTopic, RawUser, TOPIC_COLUMNS, USER_COLUMNS,
  },
};

/// Name of the statistics row holding the total number of topics.
pub const TOPICS_STATISTIC: &str = "topics";

// ─── Transactions ────────────────────────────────────────────────────────────

/// Run `f` inside one transaction on the connection thread.
///
/// The transaction commits only if `f` returns `Ok`. Any `Err`, whether a
/// storage failure or an expected rejection such as a short title, drops
/// the transaction, which rolls it back, and is handed back unchanged.
pub async fn run_in_transaction<T, F>(
  conn: &tokio_rusqlite::Connection,
  behavior: TransactionBehavior,
  f: F,
) -> Result<T>
where
  F: FnOnce(&Transaction<'_>) -> Result<T> + Send + 'static,
  T: Send + 'static,
{
  conn
    .call(move |conn| {
      let tx = conn.transaction_with_behavior(behavior)?;
      let outcome = f(&tx);
      if outcome.is_ok() {
        tx.commit()?;
      }
      Ok(outcome)
    })
    .await?
}

// ─── Topics ──────────────────────────────────────────────────────────────────

pub fn find_topic(tx: &Transaction<'_>, topic_id: &str) -> rusqlite::Result<Option<RawTopic>> {
  tx.query_row(
    &format!("SELECT {TOPIC_COLUMNS} FROM topics WHERE topic_id = ?1"),
    rusqlite::params![topic_id],
    RawTopic::from_row,
  )
  .optional()
}

pub fn find_topic_by_short_id(
  tx: &Transaction<'_>,
  short_id: &str,
) -> rusqlite::Result<Option<RawTopic>> {
  tx.query_row(
    &format!("SELECT {TOPIC_COLUMNS} FROM topics WHERE short_id = ?1"),
    rusqlite::params![short_id],
    RawTopic::from_row,
  )
  .optional()
}

/// Insert `topic`, taking the first of `short_ids` that is not already in
/// use. Returns the short id that was stored.
pub fn insert_topic(
  tx: &Transaction<'_>,
  topic: &RawTopic,
  short_ids: &[String],
) -> rusqlite::Result<String> {
  with_free_short_id(short_ids, |short_id| {
    tx.execute(
      &format!(
        "INSERT INTO topics ({TOPIC_COLUMNS})
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
      ),
      rusqlite::params![
        topic.topic_id,
        short_id,
        topic.title,
        topic.body,
        topic.comments_count,
        topic.category_id,
        topic.user_id,
        topic.score,
        topic.created_at,
        topic.updated_at,
      ],
    )
  })
  .map(|(short_id, _)| short_id.to_owned())
}

/// Persist the columns an edit may change.
pub fn update_topic(tx: &Transaction<'_>, topic: &RawTopic) -> rusqlite::Result<()> {
  tx.execute(
    "UPDATE topics SET title = ?1, body = ?2, category_id = ?3, updated_at = ?4
     WHERE topic_id = ?5",
    rusqlite::params![
      topic.title,
      topic.body,
      topic.category_id,
      topic.updated_at,
      topic.topic_id,
    ],
  )?;
  Ok(())
}

/// Which topics a page is drawn from.
#[derive(Debug, Clone)]
pub enum PageFilter {
  All,
  User(String),
  Category(String),
}

/// Up to `limit` topics created strictly before `offset`, newest first.
pub fn list_topics(
  tx: &Transaction<'_>,
  filter: &PageFilter,
  offset: &str,
  limit: usize,
) -> rusqlite::Result<Vec<RawTopic>> {
  let limit = i64::try_from(limit).unwrap_or(i64::MAX);
  let (scope, scope_id) = match filter {
    PageFilter::All => ("", None),
    PageFilter::User(id) => ("user_id = ?3 AND ", Some(id)),
    PageFilter::Category(id) => ("category_id = ?3 AND ", Some(id)),
  };

  let mut params: Vec<&dyn ToSql> = vec![&offset, &limit];
  if let Some(id) = scope_id {
    params.push(id);
  }

  let mut stmt = tx.prepare(&format!(
    "SELECT {TOPIC_COLUMNS} FROM topics
     WHERE {scope}created_at < ?1
     ORDER BY created_at DESC
     LIMIT ?2"
  ))?;
  let rows = stmt
    .query_map(params.as_slice(), RawTopic::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

pub fn topics_count(tx: &Transaction<'_>) -> rusqlite::Result<i64> {
  tx.query_row("SELECT count(*) FROM topics", [], |r| r.get(0))
}

pub fn topics_count_by_category(tx: &Transaction<'_>, category_id: &str) -> rusqlite::Result<i64> {
  tx.query_row(
    "SELECT count(*) FROM topics WHERE category_id = ?1",
    rusqlite::params![category_id],
    |r| r.get(0),
  )
}

// ─── Short id backfill ───────────────────────────────────────────────────────

/// The columns the backfill sweep needs from a `topics` row.
#[derive(Debug)]
pub struct ShortIdRow {
  pub topic_id:   String,
  pub short_id:   Option<String>,
  pub created_at: String,
}

pub fn scan_short_ids(
  tx: &Transaction<'_>,
  offset: &str,
  limit: u32,
) -> rusqlite::Result<Vec<ShortIdRow>> {
  let mut stmt = tx.prepare(
    "SELECT topic_id, short_id, created_at FROM topics
     WHERE created_at < ?1
     ORDER BY created_at DESC
     LIMIT ?2",
  )?;
  let rows = stmt
    .query_map(rusqlite::params![offset, limit], |row| {
      Ok(ShortIdRow {
        topic_id:   row.get(0)?,
        short_id:   row.get(1)?,
        created_at: row.get(2)?,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

/// Give `topic_id` the first free candidate short id, unless it already has
/// one. Runs as a standalone statement outside any transaction.
///
/// Returns whether the row was changed.
pub fn assign_short_id(
  conn: &Connection,
  topic_id: &str,
  short_ids: &[String],
) -> rusqlite::Result<bool> {
  let (_, changed) = with_free_short_id(short_ids, |short_id| {
    conn.execute(
      "UPDATE topics SET short_id = ?1 WHERE topic_id = ?2 AND short_id IS NULL",
      rusqlite::params![short_id, topic_id],
    )
  })?;
  Ok(changed > 0)
}

/// Try `write` with each candidate in turn, moving on only when the
/// candidate collides with an existing short id.
fn with_free_short_id<'a, T>(
  short_ids: &'a [String],
  mut write: impl FnMut(&str) -> rusqlite::Result<T>,
) -> rusqlite::Result<(&'a str, T)> {
  let mut last_err = None;
  for short_id in short_ids {
    match write(short_id.as_str()) {
      Ok(v) => return Ok((short_id.as_str(), v)),
      Err(e) if is_short_id_conflict(&e) => {
        tracing::debug!(%short_id, "short id already taken");
        last_err = Some(e);
      }
      Err(e) => return Err(e),
    }
  }
  Err(last_err.unwrap_or(rusqlite::Error::InvalidQuery))
}

fn is_short_id_conflict(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(f, Some(msg))
      if f.code == ErrorCode::ConstraintViolation && msg.contains("topics.short_id")
  )
}

// ─── Categories ──────────────────────────────────────────────────────────────

pub fn find_category(
  tx: &Transaction<'_>,
  category_id: &str,
) -> rusqlite::Result<Option<RawCategory>> {
  tx.query_row(
    &format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE category_id = ?1"),
    rusqlite::params![category_id],
    RawCategory::from_row,
  )
  .optional()
}

/// Every category, in display order.
pub fn list_categories(tx: &Transaction<'_>) -> rusqlite::Result<Vec<RawCategory>> {
  let mut stmt = tx.prepare(&format!(
    "SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY position, created_at"
  ))?;
  let rows = stmt
    .query_map([], RawCategory::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

pub fn insert_category(tx: &Transaction<'_>, category: &RawCategory) -> rusqlite::Result<()> {
  tx.execute(
    &format!(
      "INSERT INTO categories ({CATEGORY_COLUMNS})
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
    ),
    rusqlite::params![
      category.category_id,
      category.name,
      category.alias,
      category.description,
      category.topics_count,
      category.last_topic_id,
      category.position,
      category.created_at,
      category.updated_at,
    ],
  )?;
  Ok(())
}

pub fn update_category_aggregate(
  tx: &Transaction<'_>,
  category_id: &str,
  topics_count: i64,
  last_topic_id: Option<&str>,
  updated_at: &str,
) -> rusqlite::Result<()> {
  tx.execute(
    "UPDATE categories SET topics_count = ?1, last_topic_id = ?2, updated_at = ?3
     WHERE category_id = ?4",
    rusqlite::params![topics_count, last_topic_id, updated_at, category_id],
  )?;
  Ok(())
}

/// Recompute `topics_count` and `last_topic_id` for one category from the
/// `topics` table. Returns `false` if the category does not exist.
pub fn recount_category(
  tx: &Transaction<'_>,
  category_id: &str,
  updated_at: &str,
) -> rusqlite::Result<bool> {
  if find_category(tx, category_id)?.is_none() {
    return Ok(false);
  }
  let count = topics_count_by_category(tx, category_id)?;
  let last: Option<String> = tx
    .query_row(
      "SELECT topic_id FROM topics WHERE category_id = ?1
       ORDER BY created_at DESC LIMIT 1",
      rusqlite::params![category_id],
      |r| r.get(0),
    )
    .optional()?;
  update_category_aggregate(tx, category_id, count, last.as_deref(), updated_at)?;
  Ok(true)
}

// ─── Users ───────────────────────────────────────────────────────────────────

pub fn find_user(tx: &Transaction<'_>, user_id: &str) -> rusqlite::Result<Option<RawUser>> {
  tx.query_row(
    &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
    rusqlite::params![user_id],
    RawUser::from_row,
  )
  .optional()
}

/// Fetch every user in `user_ids` with a single query.
pub fn find_users(tx: &Transaction<'_>, user_ids: &[String]) -> rusqlite::Result<Vec<RawUser>> {
  if user_ids.is_empty() {
    return Ok(Vec::new());
  }
  let placeholders = vec!["?"; user_ids.len()].join(", ");
  let mut stmt = tx.prepare(&format!(
    "SELECT {USER_COLUMNS} FROM users WHERE user_id IN ({placeholders})"
  ))?;
  let rows = stmt
    .query_map(rusqlite::params_from_iter(user_ids), RawUser::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

pub fn insert_user(tx: &Transaction<'_>, user: &RawUser) -> rusqlite::Result<()> {
  tx.execute(
    &format!("INSERT INTO users ({USER_COLUMNS}) VALUES (?1, ?2, ?3, ?4)"),
    rusqlite::params![user.user_id, user.username, user.role, user.created_at],
  )?;
  Ok(())
}

// ─── Statistics ──────────────────────────────────────────────────────────────

/// Set statistic `name` to `count`, creating the row on first use.
pub fn upsert_statistic(
  tx: &Transaction<'_>,
  statistic_id: &str,
  name: &str,
  count: i64,
  now: &str,
) -> rusqlite::Result<()> {
  tx.execute(
    "INSERT INTO statistics (statistic_id, name, count, created_at, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?4)
     ON CONFLICT(name) DO UPDATE SET count = excluded.count, updated_at = excluded.updated_at",
    rusqlite::params![statistic_id, name, count, now],
  )?;
  Ok(())
}

pub fn find_statistic(tx: &Transaction<'_>, name: &str) -> rusqlite::Result<Option<i64>> {
  tx.query_row(
    "SELECT count FROM statistics WHERE name = ?1",
    rusqlite::params![name],
    |r| r.get(0),
  )
  .optional()
}
