use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::error;

use learning_feeds::config;
use learning_feeds::ingest;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Synchronize the upstream course catalog into SQLite and exit"
)]
struct Args {
    /// Path to YAML config file (defaults are used when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Store path, overrides `app.db_path` and DB_PATH
    #[arg(long)]
    db_path: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    learning_feeds::init_tracing();

    let args = Args::parse();
    let mut cfg = config::load(args.config.as_deref())?.with_env();
    if let Some(path) = args.db_path {
        cfg.app.db_path = Some(path);
    }

    if let Err(err) = ingest::load(&cfg).await {
        error!(
            error = %err,
            rerun_safe = err.is_retryable(),
            "catalog sync failed"
        );
        return Err(err.into());
    }
    Ok(())
}
