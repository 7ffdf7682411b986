use anyhow::Result;
use clap::Parser;
use itslive_meta::cli::{run, Cli};
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins; `info` otherwise.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Secrets such as STAC_API_TOKEN may come from a local .env file.
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let result = run(cli).await;
    if let Err(e) = &result {
        tracing::error!(error = %e, "itslive-meta exited with error");
    }
    result
}
