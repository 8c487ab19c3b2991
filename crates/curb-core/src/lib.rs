//! Core types and trait definitions for the Curb reporting backend.
//!
//! This crate is deliberately free of HTTP, database, and runtime
//! dependencies. All other crates depend on it; it depends on nothing
//! proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod actor;
pub mod cache;
pub mod error;
pub mod notify;
pub mod report;
pub mod store;
pub mod tracking;

pub use error::{Error, Result};
