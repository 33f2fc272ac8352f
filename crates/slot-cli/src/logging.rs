//! Tracing setup. Everything goes to stderr; stdout carries only JSON results.

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{LogFormat, LogSettings};

const TARGETS: [&str; 3] = ["slotbook", "slot_engine", "slot_engine_sqlite"];

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `verbose` selects `debug` and the
/// configured level applies to this workspace's crates only.
pub fn init(settings: &LogSettings, verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { settings.level.as_str() };

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => {
            let directives = TARGETS
                .iter()
                .map(|target| format!("{target}={level}"))
                .collect::<Vec<_>>()
                .join(",");
            EnvFilter::try_new(&directives)
                .with_context(|| format!("Invalid log level: {level}"))?
        }
    };

    let layer = match settings.format {
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(verbose)
            .without_time()
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .context("Failed to install tracing subscriber")
}
