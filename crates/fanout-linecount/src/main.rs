#![doc = include_str!("../README.md")]

mod counter;

use clap::Parser;
use counter::config::{CliArgs, Config};
use counter::run::run;
use counter::telemetry::{init_telemetry, shutdown_telemetry};
use tokio::io::BufReader;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = Config::try_from(args)?;

    let providers = init_telemetry()?;
    log_startup_info(&config);

    let input = BufReader::new(tokio::io::stdin());
    let mut output = tokio::io::stdout();
    let result = run(&config, input, &mut output).await;

    match &result {
        Ok(summary) => tracing::info!(
            "Counted {} matching lines in {} sources ({} failed)",
            summary.total,
            summary.sources(),
            summary.failed
        ),
        Err(e) => tracing::error!("Run failed: {e:#}"),
    }

    shutdown_telemetry(providers);
    result.map(|_| ())
}

fn log_startup_info(config: &Config) {
    if cfg!(debug_assertions) {
        tracing::info!("Starting linecount with full config: {:#?}", config);
    } else {
        tracing::info!(
            "Starting linecount over {} sources with up to {} workers",
            config.source_kind,
            config.max_workers
        );
    }
}
