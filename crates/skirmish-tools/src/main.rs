//! Skirmish scenario runner.
//!
//! Runs a combat scenario headlessly and prints every notification as one
//! JSON object per line, followed by a summary line.
//!
//! ```text
//! skirmish-sim crates/skirmish-tools/scenarios/combo_then_stun.toml
//! ```

use anyhow::{Context, Result};
use serde::Serialize;
use skirmish_tools::{RunSummary, Scenario, ScenarioRunner};
use std::io::{self, Write};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Serialize)]
struct SummaryLine<'a> {
    summary: &'a RunSummary,
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::from_default_env().add_directive("skirmish=info".parse()?))
        .init();

    let path = std::env::args()
        .nth(1)
        .context("usage: skirmish-sim <scenario.toml>")?;
    let scenario =
        Scenario::load_from(&path).with_context(|| format!("failed to load scenario {path}"))?;

    let (events, summary) = ScenarioRunner::new(scenario).run();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for event in &events {
        writeln!(out, "{}", serde_json::to_string(event)?)?;
    }
    writeln!(out, "{}", serde_json::to_string(&SummaryLine { summary: &summary })?)?;
    Ok(())
}
