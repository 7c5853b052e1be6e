use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use harvester_core::{parse_levels, parse_url_lines, HarvestRequest};
use log::LevelFilter;

use crate::logging::{self, LogDestination};
use crate::report::OutputFormat;

/// Fetch web pages and list their h1-h6 headings.
#[derive(Debug, Clone, Parser)]
#[command(name = "heading-harvester", version)]
pub struct Cli {
    /// URLs to harvest. A missing scheme defaults to https://
    pub urls: Vec<String>,

    /// Read URLs from a file, one per line ("-" reads stdin)
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Read a JSON request body: {"urls": [...], "heading_types": [...]}
    #[arg(long, value_name = "FILE", conflicts_with_all = ["input", "urls"])]
    pub request: Option<PathBuf>,

    /// Heading levels to extract, e.g. h1,h2 (default: all six)
    #[arg(short, long, value_delimiter = ',')]
    pub levels: Vec<String>,

    /// RON configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// User-Agent header sent with every request
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Verify TLS certificates (verification is off by default)
    #[arg(long)]
    pub verify_tls: bool,

    /// Report non-2xx responses as errors instead of parsing them
    #[arg(long)]
    pub strict: bool,

    /// Maximum number of pages fetched at once
    #[arg(short = 'j', long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Also write logs to this file
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    pub fn log_level(&self) -> LevelFilter {
        logging::level_for(self.verbose, self.quiet)
    }

    pub fn log_destination(&self) -> LogDestination {
        match &self.log_file {
            Some(path) => LogDestination::Both(path.clone()),
            None => LogDestination::Terminal,
        }
    }
}

/// Builds the harvest request from the command line.
///
/// With `--request` the JSON body alone supplies URLs (positional URLs are
/// rejected by the parser) and `--levels` overrides its `heading_types`.
/// Otherwise URLs come from the positional arguments followed by `--input`;
/// with neither, stdin is read when it is not a terminal.
pub fn resolve_request(
    cli: &Cli,
    mut stdin: impl Read,
    stdin_is_terminal: bool,
) -> Result<HarvestRequest> {
    let levels = parse_levels(&cli.levels)?;

    if let Some(path) = &cli.request {
        let body = read_source(path, &mut stdin)?;
        let request = HarvestRequest::from_json(&body)
            .with_context(|| format!("invalid request in {}", path.display()))?;
        return Ok(request.with_levels(levels));
    }

    let mut urls = cli.urls.clone();
    if let Some(path) = &cli.input {
        urls.extend(parse_url_lines(&read_source(path, &mut stdin)?));
    } else if urls.is_empty() && !stdin_is_terminal {
        let mut text = String::new();
        stdin
            .read_to_string(&mut text)
            .context("failed to read URLs from stdin")?;
        urls = parse_url_lines(&text);
    }

    Ok(HarvestRequest::new(urls)?.with_levels(levels))
}

fn read_source(path: &Path, stdin: &mut impl Read) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        stdin
            .read_to_string(&mut text)
            .context("failed to read stdin")?;
        return Ok(text);
    }
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}
