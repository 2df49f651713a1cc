//! [`SqliteStore`], the SQLite implementation of [`TopicStore`].

use std::{collections::HashMap, path::Path};

use agora_core::{
  category::{Category, NewCategory},
  short_id,
  store::{Backfill, TopicScope, TopicStore},
  topic::{self, NewTopic, Topic, TopicChanges},
  user::{Role, User},
};
use chrono::{DateTime, Utc};
use rusqlite::{Transaction, TransactionBehavior};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
  Result,
  dispersal::{self, DispersalQueue},
  encode::{RawCategory, RawTopic, RawUser, decode_dt, decode_uuid, encode_dt, encode_uuid},
  queries::{self, PageFilter, TOPICS_STATISTIC},
  schema::SCHEMA,
};

// ─── Options ─────────────────────────────────────────────────────────────────

/// Tunables for [`SqliteStore::open_with`].
#[derive(Debug, Clone)]
pub struct StoreOptions {
  /// How many pending category recounts may queue before new ones are
  /// dropped.
  pub dispersal_capacity: usize,
}

impl Default for StoreOptions {
  fn default() -> Self {
    Self { dispersal_capacity: dispersal::DEFAULT_CAPACITY }
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// An Agora topic store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection and queue handle are
/// reference-counted. Must be opened inside a tokio runtime, which hosts the
/// dispersal worker.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
  dispersal:       DispersalQueue,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    Self::open_with(path, StoreOptions::default()).await
  }

  pub async fn open_with(path: impl AsRef<Path>, options: StoreOptions) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn, options).await
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn, StoreOptions::default()).await
  }

  async fn init(conn: tokio_rusqlite::Connection, options: StoreOptions) -> Result<Self> {
    conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    let dispersal = DispersalQueue::spawn(conn.clone(), options.dispersal_capacity);
    Ok(Self { conn, dispersal })
  }

  /// The queue that recomputes category aggregates after recategorization.
  pub fn dispersal(&self) -> &DispersalQueue { &self.dispersal }

  async fn write<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&Transaction<'_>) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    queries::run_in_transaction(&self.conn, TransactionBehavior::Immediate, f).await
  }

  async fn read<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&Transaction<'_>) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    queries::run_in_transaction(&self.conn, TransactionBehavior::Deferred, f).await
  }

  // ── Users ─────────────────────────────────────────────────────────────────

  pub async fn add_user(&self, username: impl Into<String>, role: Role) -> Result<User> {
    let user = User {
      user_id: Uuid::new_v4(),
      username: username.into(),
      role,
      created_at: Utc::now(),
    };
    let raw = RawUser::from_user(&user);
    self
      .write(move |tx| Ok(queries::insert_user(tx, &raw)?))
      .await?;
    Ok(user)
  }

  pub async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    let id_str = encode_uuid(id);
    self
      .read(move |tx| {
        queries::find_user(tx, &id_str)?
          .map(RawUser::into_user)
          .transpose()
      })
      .await
  }

  // ── Categories ────────────────────────────────────────────────────────────

  pub async fn add_category(&self, input: NewCategory) -> Result<Category> {
    let now = Utc::now();
    let category = Category {
      category_id:   Uuid::new_v4(),
      name:          input.name,
      alias:         input.alias,
      description:   input.description,
      topics_count:  0,
      last_topic_id: None,
      position:      input.position,
      created_at:    now,
      updated_at:    now,
    };
    let raw = RawCategory::from_category(&category);
    self
      .write(move |tx| Ok(queries::insert_category(tx, &raw)?))
      .await?;
    Ok(category)
  }

  pub async fn get_category(&self, id: Uuid) -> Result<Option<Category>> {
    let id_str = encode_uuid(id);
    self
      .read(move |tx| {
        queries::find_category(tx, &id_str)?
          .map(RawCategory::into_category)
          .transpose()
      })
      .await
  }

  pub async fn list_categories(&self) -> Result<Vec<Category>> {
    self
      .read(|tx| {
        queries::list_categories(tx)?
          .into_iter()
          .map(RawCategory::into_category)
          .collect()
      })
      .await
  }

  /// Recompute a category's aggregates now, bypassing the dispersal queue.
  /// Returns `false` if the category does not exist.
  pub async fn recount_category(&self, id: Uuid) -> Result<bool> {
    dispersal::recount_category(&self.conn, id).await
  }

  // ── Statistics ────────────────────────────────────────────────────────────

  /// The stored value of statistic `name`, if it has ever been written.
  pub async fn statistic(&self, name: &str) -> Result<Option<i64>> {
    let name = name.to_owned();
    self
      .read(move |tx| Ok(queries::find_statistic(tx, &name)?))
      .await
  }

  /// The stored total number of topics.
  pub async fn topics_statistic(&self) -> Result<i64> {
    Ok(self.statistic(TOPICS_STATISTIC).await?.unwrap_or(0))
  }
}

// ─── Row assembly ────────────────────────────────────────────────────────────

/// Attach a topic's author and category.
fn attach(tx: &Transaction<'_>, mut topic: Topic) -> Result<Topic> {
  topic.user = queries::find_user(tx, &encode_uuid(topic.user_id))?
    .map(RawUser::into_user)
    .transpose()?;
  topic.category = queries::find_category(tx, &encode_uuid(topic.category_id))?
    .map(RawCategory::into_category)
    .transpose()?;
  Ok(topic)
}

fn with_associations(tx: &Transaction<'_>, raw: RawTopic) -> Result<Topic> {
  attach(tx, raw.into_topic()?)
}

fn category_set(tx: &Transaction<'_>) -> Result<HashMap<Uuid, Category>> {
  queries::list_categories(tx)?
    .into_iter()
    .map(|raw| raw.into_category().map(|c| (c.category_id, c)))
    .collect()
}

/// Load the authors of `topics` with one query.
fn user_set(tx: &Transaction<'_>, topics: &[Topic]) -> Result<HashMap<Uuid, User>> {
  let mut ids: Vec<String> = topics.iter().map(|t| encode_uuid(t.user_id)).collect();
  ids.sort_unstable();
  ids.dedup();
  queries::find_users(tx, &ids)?
    .into_iter()
    .map(|raw| raw.into_user().map(|u| (u.user_id, u)))
    .collect()
}

fn decode_page(raws: Vec<RawTopic>) -> Result<Vec<Topic>> {
  raws.into_iter().map(RawTopic::into_topic).collect()
}

// ─── TopicStore impl ─────────────────────────────────────────────────────────

impl TopicStore for SqliteStore {
  type Error = crate::Error;

  async fn create_topic(&self, author: &User, input: NewTopic) -> Result<Topic> {
    let input = input.normalized()?;
    let now = Utc::now();
    let mut topic = Topic {
      topic_id:       Uuid::new_v4(),
      short_id:       None,
      title:          input.title,
      body:           input.body,
      comments_count: 0,
      category_id:    input.category_id,
      user_id:        author.user_id,
      score:          0,
      created_at:     now,
      updated_at:     now,
      user:           None,
      category:       None,
    };
    let candidates = short_id::candidates(now)?;
    let raw = RawTopic::from_topic(&topic);
    let statistic_id = encode_uuid(Uuid::new_v4());
    let category_id = input.category_id;

    let short_id = self
      .write(move |tx| {
        if queries::find_category(tx, &raw.category_id)?.is_none() {
          return Err(agora_core::Error::CategoryNotFound(category_id).into());
        }
        let count = queries::topics_count_by_category(tx, &raw.category_id)?;
        let short_id = queries::insert_topic(tx, &raw, &candidates)?;
        queries::update_category_aggregate(
          tx,
          &raw.category_id,
          count + 1,
          Some(raw.topic_id.as_str()),
          &raw.created_at,
        )?;
        let total = queries::topics_count(tx)?;
        queries::upsert_statistic(tx, &statistic_id, TOPICS_STATISTIC, total, &raw.created_at)?;
        Ok(short_id)
      })
      .await?;

    debug!(topic_id = %topic.topic_id, %short_id, %category_id, "topic created");
    topic.short_id = Some(short_id);
    Ok(topic)
  }

  async fn update_topic(
    &self,
    actor: &User,
    topic_id: Uuid,
    changes: TopicChanges,
  ) -> Result<Topic> {
    let changes = changes.normalized()?;
    let actor = actor.clone();
    let id_str = encode_uuid(topic_id);
    let now = Utc::now();

    let updated = self
      .write(move |tx| {
        let Some(raw) = queries::find_topic(tx, &id_str)? else {
          return Ok(None);
        };
        let mut topic = raw.into_topic()?;
        if !actor.can_edit(topic.user_id) {
          return Err(
            agora_core::Error::Forbidden { user: actor.user_id, topic: topic_id }.into(),
          );
        }

        if let Some(id) = changes.category_id.filter(|id| *id != topic.category_id)
          && queries::find_category(tx, &encode_uuid(id))?.is_none()
        {
          return Err(agora_core::Error::CategoryNotFound(id).into());
        }
        let previous = changes.apply(&mut topic);
        topic.updated_at = now;
        queries::update_topic(tx, &RawTopic::from_topic(&topic))?;

        Ok(Some((attach(tx, topic)?, previous)))
      })
      .await?;

    let Some((topic, previous)) = updated else {
      return Err(agora_core::Error::TopicNotFound(topic_id).into());
    };
    if let Some(previous) = previous {
      debug!(%topic_id, from = %previous, to = %topic.category_id, "topic recategorized");
      self.dispersal.submit(previous);
      self.dispersal.submit(topic.category_id);
    }
    Ok(topic)
  }

  async fn read_topic(&self, id: &str) -> Result<Option<Topic>> {
    let id = id.to_owned();
    self
      .read(move |tx| {
        let mut raw = match Uuid::parse_str(&id) {
          Ok(uuid) => queries::find_topic(tx, &encode_uuid(uuid))?,
          Err(_) => None,
        };
        if raw.is_none()
          && let Some(short) = topic::short_segment(&id)
        {
          raw = queries::find_topic_by_short_id(tx, short)?;
        }
        raw.map(|raw| with_associations(tx, raw)).transpose()
      })
      .await
  }

  async fn read_topic_by_short_id(&self, id: &str) -> Result<Option<Topic>> {
    let Some(short) = topic::short_segment(id) else {
      return Ok(None);
    };
    let short = short.to_owned();
    self
      .read(move |tx| {
        queries::find_topic_by_short_id(tx, &short)?
          .map(|raw| with_associations(tx, raw))
          .transpose()
      })
      .await
  }

  async fn list_topics(
    &self,
    scope: TopicScope<'_>,
    offset: Option<DateTime<Utc>>,
  ) -> Result<Vec<Topic>> {
    let offset = encode_dt(offset.unwrap_or_else(Utc::now));

    match scope {
      TopicScope::All => {
        self
          .read(move |tx| {
            let categories = category_set(tx)?;
            let raws =
              queries::list_topics(tx, &PageFilter::All, &offset, topic::PAGE_SIZE)?;
            let mut topics = decode_page(raws)?;
            let users = user_set(tx, &topics)?;
            for t in &mut topics {
              t.user = users.get(&t.user_id).cloned();
              t.category = categories.get(&t.category_id).cloned();
            }
            Ok(topics)
          })
          .await
      }
      TopicScope::User(user) => {
        let user = user.clone();
        let filter = PageFilter::User(encode_uuid(user.user_id));
        self
          .read(move |tx| {
            let categories = category_set(tx)?;
            let raws = queries::list_topics(tx, &filter, &offset, topic::PAGE_SIZE)?;
            let mut topics = decode_page(raws)?;
            for t in &mut topics {
              t.user = Some(user.clone());
              t.category = categories.get(&t.category_id).cloned();
            }
            Ok(topics)
          })
          .await
      }
      TopicScope::Category(category) => {
        let category = category.clone();
        let filter = PageFilter::Category(encode_uuid(category.category_id));
        self
          .read(move |tx| {
            let raws = queries::list_topics(tx, &filter, &offset, topic::PAGE_SIZE)?;
            let mut topics = decode_page(raws)?;
            let users = user_set(tx, &topics)?;
            for t in &mut topics {
              t.user = users.get(&t.user_id).cloned();
              t.category = Some(category.clone());
            }
            Ok(topics)
          })
          .await
      }
    }
  }

  async fn backfill_short_ids(
    &self,
    offset: Option<DateTime<Utc>>,
    limit: u32,
  ) -> Result<Backfill> {
    let offset = offset.unwrap_or_else(Utc::now);
    let offset_str = encode_dt(offset);
    let rows = self
      .read(move |tx| Ok(queries::scan_short_ids(tx, &offset_str, limit)?))
      .await?;

    let scanned = rows.len() as u64;
    let mut last = offset;
    let mut pending: HashMap<Uuid, Vec<String>> = HashMap::new();
    for row in rows {
      last = decode_dt(&row.created_at)?;
      if row.short_id.is_some() {
        continue;
      }
      pending.insert(decode_uuid(&row.topic_id)?, short_id::candidates(last)?);
    }

    let mut assigned = 0;
    for (topic_id, candidates) in pending {
      let id_str = encode_uuid(topic_id);
      let changed = self
        .conn
        .call(move |conn| Ok(queries::assign_short_id(conn, &id_str, &candidates)?))
        .await?;
      if changed {
        assigned += 1;
      }
    }

    info!(scanned, assigned, last = %last, "short id backfill page done");
    Ok(Backfill { scanned, assigned, last })
  }
}
