mod cli;
mod config;
mod logging;
mod report;

use std::io::{self, IsTerminal};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use engine_logging::{engine_info, engine_warn};
use harvester_engine::{EngineHandle, HarvestEvent, ProgressSink};

use crate::cli::Cli;
use crate::config::AppConfig;

/// Logs one line per finished URL.
struct LogProgressSink {
    total: usize,
}

impl ProgressSink for LogProgressSink {
    fn emit(&self, event: HarvestEvent) {
        if let HarvestEvent::Completed { index, url, result } = event {
            let position = index + 1;
            match result {
                Ok(count) => engine_info!("[{position}/{}] {url}: {count} heading(s)", self.total),
                Err(kind) => engine_warn!("[{position}/{}] {url}: {kind}", self.total),
            }
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::initialize(cli.log_level(), cli.log_destination());

    let config = AppConfig::load(&cli).context("invalid configuration")?;
    let stdin = io::stdin();
    let is_terminal = stdin.is_terminal();
    let request = cli::resolve_request(&cli, stdin.lock(), is_terminal)?;

    let engine = EngineHandle::new(config.engine_config())?;
    let sink = LogProgressSink {
        total: request.urls().len(),
    };
    let result = engine.harvest_with_sink(&request, &sink);

    let generated_utc = Utc::now().to_rfc3339();
    let mut out = io::stdout().lock();
    report::write_report(&mut out, &result, cli.format, &generated_utc)
        .context("failed to write report")?;
    Ok(())
}
