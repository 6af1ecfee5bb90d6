//! Backup state persistence for the vaultsync engine.
//!
//! Provides the [`StateBackend`] trait (watermarks and job run tracking),
//! the [`RecordSink`] trait (per-endpoint record persistence), and the
//! SQLite implementation of both.

#![warn(clippy::pedantic)]

pub mod backend;
pub mod error;
pub mod sink;
pub mod sqlite;

pub use backend::{JobRecord, StateBackend};
pub use error::StateError;
pub use sink::RecordSink;
pub use sqlite::SqliteStateBackend;
