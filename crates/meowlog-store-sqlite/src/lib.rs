//! SQLite backend for Meowlog.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. [`SqliteStore`] implements both the
//! persistence boundary ([`meowlog_core::store::HealthStore`]) and a
//! table-backed [`meowlog_core::reminder::AlertCenter`].

mod alerts;
mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
