use anyhow::{Context, Result};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

use db_dump::cli::{exit_status, Cli};
use db_dump::core::{BackupManager, DockerRuntime};
use db_dump::utils::{format_bytes, AppConfig};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_logging(cli.json_logs);

    ExitCode::from(exit_status(&run(cli).await))
}

fn init_logging(json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);

    let init = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(e) = init {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mode = cli.run_mode()?;
    let config = AppConfig::load(cli.config.as_deref())?;
    let out_dir = config.out_dir(cli.out_dir.as_deref());

    let runtime = DockerRuntime::connect()
        .context("Failed to connect to Docker daemon. Is Docker running?")?;

    let manager = BackupManager::new(runtime, out_dir, config.overrides);
    let results = manager.run(&mode).await?;

    let total: u64 = results.iter().map(|r| r.bytes_written).sum();
    info!(
        "Backed up {} container(s) to {} ({})",
        results.len(),
        manager.out_dir().display(),
        format_bytes(total)
    );

    Ok(())
}
