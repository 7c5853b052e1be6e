use std::io::Write;

use anyhow::Result;
use clap::ValueEnum;
use harvester_core::{HarvestResult, UrlOutcome};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// `{"status", "generated_utc", "results": [...]}`
    Json,
    /// One block per URL with `H<level> text` lines
    Text,
}

#[derive(Serialize)]
struct Envelope<'a> {
    status: &'static str,
    generated_utc: &'a str,
    #[serde(flatten)]
    result: &'a HarvestResult,
}

pub fn write_report(
    out: &mut impl Write,
    result: &HarvestResult,
    format: OutputFormat,
    generated_utc: &str,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let envelope = Envelope {
                status: "success",
                generated_utc,
                result,
            };
            serde_json::to_writer_pretty(&mut *out, &envelope)?;
            writeln!(out)?;
        }
        OutputFormat::Text => write_text(out, result)?,
    }
    out.flush()?;
    Ok(())
}

fn write_text(out: &mut impl Write, result: &HarvestResult) -> std::io::Result<()> {
    for (i, outcome) in result.outcomes().iter().enumerate() {
        if i > 0 {
            writeln!(out)?;
        }
        writeln!(out, "{}", outcome.resolved_url())?;
        match outcome {
            UrlOutcome::Success { headings, .. } if headings.is_empty() => {
                writeln!(out, "  (no headings)")?;
            }
            UrlOutcome::Success { headings, .. } => {
                for heading in headings {
                    writeln!(out, "  {} {}", heading.level(), heading.text())?;
                }
            }
            UrlOutcome::Failure { error_message, .. } => {
                writeln!(out, "  error: {error_message}")?;
            }
        }
    }
    Ok(())
}
