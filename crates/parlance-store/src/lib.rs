//! # parlance-store
//!
//! Local conversation history for the Parlance client, backed by SQLite.
//!
//! The crate exposes a synchronous `Database` handle that wraps a
//! `rusqlite::Connection` and provides typed helpers for inboxes and their
//! messages.  Message history is read backwards in pages: the newest page
//! first, then pages strictly older than a cursor message.

pub mod database;
pub mod inboxes;
pub mod messages;
pub mod migrations;
pub mod models;

mod error;

pub use database::Database;
pub use error::{Result, StoreError};
pub use models::*;
