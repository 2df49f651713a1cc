//! agora-admin maintenance binary.
//!
//! Reads `agora.toml` (or the path specified with `--config`), opens the
//! SQLite store and runs one maintenance command against it.
//!
//! # Short id backfill
//!
//! Topics created before short ids existed are swept newest first:
//!
//! ```
//! cargo run -p agora-admin -- backfill --limit 1000
//! ```

mod settings;

use std::path::PathBuf;

use agora_core::{
  category::NewCategory,
  store::{TopicScope, TopicStore},
  user::Role,
};
use agora_store_sqlite::SqliteStore;
use anyhow::Context as _;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::settings::{AdminConfig, expand_tilde};

#[derive(Parser)]
#[command(author, version, about = "Agora topic store maintenance")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "agora.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Assign short ids to topics that predate them.
  Backfill {
    /// Rows scanned per page (defaults to `backfill_batch`).
    #[arg(long)]
    limit:  Option<u32>,
    /// Only consider topics created before this RFC 3339 instant.
    #[arg(long)]
    offset: Option<DateTime<Utc>>,
    /// Stop after a single page.
    #[arg(long)]
    once:   bool,
  },
  /// Recompute a category's topic count and latest topic.
  Recount { category_id: Uuid },
  /// Print the stored topic total and per-category counts.
  Stats,
  /// Print one page of topics as JSON lines, newest first.
  List {
    #[arg(long, conflicts_with = "category")]
    user:     Option<Uuid>,
    #[arg(long)]
    category: Option<Uuid>,
    /// Only list topics created before this RFC 3339 instant.
    #[arg(long)]
    offset:   Option<DateTime<Utc>>,
  },
  AddUser {
    username: String,
    #[arg(long)]
    admin:    bool,
  },
  AddCategory {
    name:        String,
    alias:       String,
    #[arg(long, default_value = "")]
    description: String,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let cfg = AdminConfig::load(&cli.config).context("failed to read configuration")?;
  let store_path = expand_tilde(&cfg.store_path);
  let store = SqliteStore::open_with(&store_path, cfg.store_options())
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  match cli.command {
    Command::Backfill { limit, offset, once } => {
      backfill(&store, limit.unwrap_or(cfg.backfill_batch), offset, once).await?
    }
    Command::Recount { category_id } => {
      if !store.recount_category(category_id).await? {
        anyhow::bail!("category {category_id} not found");
      }
      let category = store
        .get_category(category_id)
        .await?
        .context("category vanished after recount")?;
      println!("{}\t{}", category.alias, category.topics_count);
    }
    Command::Stats => {
      println!("topics\t{}", store.topics_statistic().await?);
      for category in store.list_categories().await? {
        println!("{}\t{}", category.alias, category.topics_count);
      }
    }
    Command::List { user, category, offset } => {
      list(&store, user, category, offset).await?
    }
    Command::AddUser { username, admin } => {
      let role = if admin { Role::Admin } else { Role::Member };
      let user = store
        .add_user(username, role)
        .await
        .context("failed to add user")?;
      println!("{}", user.user_id);
    }
    Command::AddCategory { name, alias, description } => {
      let category = store
        .add_category(NewCategory { description, ..NewCategory::new(name, alias) })
        .await
        .context("failed to add category")?;
      println!("{}", category.category_id);
    }
  }

  Ok(())
}

/// Sweep backwards from `offset` until a page scans nothing.
async fn backfill(
  store: &SqliteStore,
  limit: u32,
  mut offset: Option<DateTime<Utc>>,
  once: bool,
) -> anyhow::Result<()> {
  let (mut scanned, mut assigned) = (0, 0);
  loop {
    let page = store
      .backfill_short_ids(offset, limit)
      .await
      .context("backfill page failed")?;
    scanned += page.scanned;
    assigned += page.assigned;
    if once || page.scanned == 0 {
      break;
    }
    offset = Some(page.last);
  }
  tracing::info!(scanned, assigned, "backfill finished");
  Ok(())
}

async fn list(
  store: &SqliteStore,
  user: Option<Uuid>,
  category: Option<Uuid>,
  offset: Option<DateTime<Utc>>,
) -> anyhow::Result<()> {
  let topics = match (user, category) {
    (Some(id), _) => {
      let user = store.get_user(id).await?.context("user not found")?;
      store.list_topics(TopicScope::User(&user), offset).await?
    }
    (None, Some(id)) => {
      let category = store.get_category(id).await?.context("category not found")?;
      store.list_topics(TopicScope::Category(&category), offset).await?
    }
    (None, None) => store.list_topics(TopicScope::All, offset).await?,
  };
  for topic in &topics {
    println!("{}", serde_json::to_string(topic)?);
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use clap::CommandFactory as _;

  use super::*;

  #[test]
  fn cli_is_well_formed() { Cli::command().debug_assert(); }

  #[test]
  fn list_scopes_are_exclusive() {
    let id = Uuid::new_v4().to_string();
    let parsed =
      Cli::try_parse_from(["agora-admin", "list", "--user", &id, "--category", &id]);
    assert!(parsed.is_err());
  }

  #[test]
  fn backfill_accepts_rfc3339_offset() {
    let cli = Cli::try_parse_from([
      "agora-admin",
      "backfill",
      "--offset",
      "2024-01-01T00:00:00Z",
      "--once",
    ])
    .unwrap();
    let Command::Backfill { limit, offset, once } = cli.command else {
      panic!("expected backfill");
    };
    assert_eq!(limit, None);
    assert!(once);
    assert_eq!(offset.map(|o| o.to_rfc3339()).as_deref(), Some("2024-01-01T00:00:00+00:00"));
  }
}
