#![deny(clippy::pedantic, clippy::all, clippy::nursery)]
#![allow(clippy::must_use_candidate)]

#[cfg(not(unix))]
compile_error!("Only unix platforms are currently supported");

use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use logmail::{EmailTransport, NdjsonSource, TransportConfig, internal, logging};
use tokio::{
    io::{BufReader, stdin},
    signal::unix::{SignalKind, signal},
};

/// Mail newline-delimited JSON log records read from stdin
#[derive(Parser, Debug)]
#[command(name = "logmail", version, long_about = None)]
struct Cli {
    /// Configuration file (TOML, or JSON when the extension is .json)
    #[arg(short, long, env = "LOGMAIL_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let cli = Cli::parse();
    let config_path = match cli.config {
        Some(path) => path,
        None => find_config_file()?,
    };

    let config = TransportConfig::from_path(&config_path).map_err(|e| {
        anyhow::anyhow!(
            "Failed to load config from {}: {e}",
            config_path.display()
        )
    })?;

    let levels = config.levels();
    let min_level = config.min_level_value()?;
    let transport = Arc::new(EmailTransport::new(config)?);
    let source = NdjsonSource::new(BufReader::new(stdin()), levels).min_level(min_level);

    internal!(level = INFO, "Reading log records from stdin");

    let mut intake = tokio::spawn({
        let transport = Arc::clone(&transport);
        async move { transport.run(source).await }
    });

    let result = tokio::select! {
        finished = &mut intake => finished?,
        signal = shutdown() => {
            signal?;
            Ok(())
        }
    };

    let outcome = transport.close().await;
    intake.abort();

    internal!(
        level = INFO,
        drained = outcome.drained(),
        "Final flush complete"
    );

    Ok(result?)
}

async fn shutdown() -> anyhow::Result<()> {
    let mut terminate = signal(SignalKind::terminate())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            internal!(level = INFO, "CTRL+C entered, draining pending notifications");
        }
        _ = terminate.recv() => {
            internal!(level = INFO, "Terminate signal received, draining pending notifications");
        }
    };

    Ok(())
}

/// Locate the configuration file when `--config`/`LOGMAIL_CONFIG` is not given:
/// 1. ./logmail.toml (current working directory)
/// 2. /etc/logmail/logmail.toml (system-wide config)
fn find_config_file() -> anyhow::Result<PathBuf> {
    let candidates = [
        PathBuf::from("./logmail.toml"),
        PathBuf::from("/etc/logmail/logmail.toml"),
    ];

    if let Some(path) = candidates.iter().find(|path| path.exists()) {
        return Ok(path.clone());
    }

    let tried = candidates
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    anyhow::bail!(
        "No configuration file found. Tried:\n  - --config / LOGMAIL_CONFIG\n{tried}"
    )
}
