//! SQLite backend for the Curb report store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. Implements both
//! [`curb_core::store::ReportStore`] and [`curb_core::store::ActorStore`];
//! the latter is a minimal mirror of the external account system, enough to
//! drive authorization and notification targeting.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{NewActor, SqliteStore};
