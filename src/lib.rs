//! Course catalog sync and Atom feed server.
//!
//! The `catalog-loader` binary walks the upstream learning-assets collection
//! into SQLite via [`ingest::run_sync`]; the `feed-server` binary republishes
//! the newest courses through [`server::router`] with conditional-GET support.

pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod ingest;
pub mod linkedin;
pub mod model;
pub mod server;
pub mod slug;

/// Install the compact `tracing` subscriber shared by both binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();
}
