use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use learning_feeds::{config, server};

#[derive(Debug, Parser)]
#[command(author, version, about = "Serve the newest courses as an Atom feed")]
struct Args {
    /// Path to YAML config file (defaults are used when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address, overrides `server.bind`
    #[arg(long, env = "BIND_ADDR")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    learning_feeds::init_tracing();

    let args = Args::parse();
    let mut cfg = config::load(args.config.as_deref())?.with_env();
    if let Some(bind) = args.bind {
        cfg.server.bind = bind;
    }
    config::validate(&cfg)?;

    server::serve(&cfg).await
}
