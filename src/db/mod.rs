//! Catalog store: schema access and row models.
//!
//! - `model`: counters and view structs returned by repositories.
//! - `repo`: SQL-only functions over the SQLite catalog.
//!
//! The loader owns the single writer connection for a run; the feed server
//! opens one short-lived read-only connection per request.

pub mod model;
pub mod repo;

pub use repo::*;

pub use model::{PageCounts, TableCounts};
