//! Core types and trait definitions for Meowlog, a cat health and medication
//! tracker.
//!
//! This crate has no database or platform dependencies. Persistence and
//! local alerts are reached through the [`store::HealthStore`] and
//! [`reminder::AlertCenter`] traits; concrete backends live in other crates.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod cat;
pub mod error;
pub mod health;
pub mod medication;
pub mod reminder;
pub mod scheduler;
pub mod service;
pub mod store;

pub use error::{Error, Result};
