//! Background recomputation of category aggregates ("dispersal").
//!
//! Moving a topic between categories leaves both categories' cached
//! `topics_count` and `last_topic_id` stale. Rather than recomputing them in
//! the editing transaction, the store queues each affected category on a
//! bounded channel drained by a single worker task. Jobs are best-effort:
//! a full queue drops the job, and a failed job is logged and not retried.
//! Both are harmless because every recount starts from a fresh `count(*)`,
//! so the next successful one repairs the counter.

use chrono::Utc;
use rusqlite::TransactionBehavior;
use tokio::sync::{
  mpsc::{self, error::TrySendError},
  oneshot,
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
  Result,
  encode::{encode_dt, encode_uuid},
  queries,
};

/// Queue capacity used when none is configured.
pub const DEFAULT_CAPACITY: usize = 64;

enum Job {
  Recount(Uuid),
  Barrier(oneshot::Sender<()>),
}

/// Handle for submitting category recounts to the background worker.
///
/// Cloning is cheap. The worker stops once every handle has been dropped.
#[derive(Clone)]
pub struct DispersalQueue {
  jobs: mpsc::Sender<Job>,
}

impl DispersalQueue {
  /// Start the worker on the current tokio runtime.
  pub(crate) fn spawn(conn: tokio_rusqlite::Connection, capacity: usize) -> Self {
    let (jobs, rx) = mpsc::channel(capacity.max(1));
    tokio::spawn(run(conn, rx));
    Self { jobs }
  }

  /// Queue a recount of `category_id` without waiting.
  ///
  /// Returns `false` if the job was dropped because the queue is full or
  /// the worker has stopped.
  pub fn submit(&self, category_id: Uuid) -> bool {
    match self.jobs.try_send(Job::Recount(category_id)) {
      Ok(()) => true,
      Err(TrySendError::Full(_)) => {
        warn!(%category_id, "dispersal queue full, dropping recount");
        false
      }
      Err(TrySendError::Closed(_)) => {
        warn!(%category_id, "dispersal worker stopped, dropping recount");
        false
      }
    }
  }

  /// Wait until every job submitted before this call has been processed.
  pub async fn flush(&self) {
    let (done, wait) = oneshot::channel();
    if self.jobs.send(Job::Barrier(done)).await.is_err() {
      return;
    }
    wait.await.ok();
  }
}

async fn run(conn: tokio_rusqlite::Connection, mut rx: mpsc::Receiver<Job>) {
  while let Some(job) = rx.recv().await {
    match job {
      Job::Recount(category_id) => match recount_category(&conn, category_id).await {
        Ok(true) => debug!(%category_id, "category aggregates recomputed"),
        Ok(false) => debug!(%category_id, "category vanished before recount"),
        Err(e) => warn!(%category_id, error = %e, "category recount failed"),
      },
      Job::Barrier(done) => {
        done.send(()).ok();
      }
    }
  }
  debug!("dispersal worker stopped");
}

/// Recompute one category's `topics_count` and `last_topic_id`.
///
/// Returns `false` if the category does not exist.
pub(crate) async fn recount_category(
  conn: &tokio_rusqlite::Connection,
  category_id: Uuid,
) -> Result<bool> {
  let id_str = encode_uuid(category_id);
  let now = encode_dt(Utc::now());
  queries::run_in_transaction(conn, TransactionBehavior::Immediate, move |tx| {
    Ok(queries::recount_category(tx, &id_str, &now)?)
  })
  .await
}
