//! Core types and trait definitions for the Agora topic store.
//!
//! This crate has no database dependency. Storage backends implement
//! [`store::TopicStore`]; binaries and services depend on the trait.

pub mod category;
pub mod error;
pub mod short_id;
pub mod store;
pub mod topic;
pub mod user;

pub use error::{Error, ErrorKind, Result};
