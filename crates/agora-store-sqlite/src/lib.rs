//! SQLite backend for the Agora topic store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime.

mod encode;
mod queries;
mod schema;
mod store;

pub mod dispersal;
pub mod error;

pub use dispersal::DispersalQueue;
pub use error::{Error, Result};
pub use queries::TOPICS_STATISTIC;
pub use store::{SqliteStore, StoreOptions};
