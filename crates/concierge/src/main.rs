// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Concierge command-line tools.
//!
//! Validates engine configuration and runs the safety guard and the
//! qualification extractor offline, without any collaborator wired in.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod check;
mod inspect;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use concierge_config::EngineConfig;

/// Concierge - SMS and voice front desk for med spas.
#[derive(Parser, Debug)]
#[command(name = "concierge", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load and validate configuration, printing diagnostics on failure.
    CheckConfig {
        /// Config file to check instead of the layered default locations.
        path: Option<PathBuf>,
    },
    /// Score an inbound message for injection, PHI and medical-advice requests.
    ScanInbound { text: String },
    /// Scan a drafted reply for leaked instructions or internal details.
    ScanOutbound { text: String },
    /// Print the qualification snapshot of a JSON transcript.
    Extract { file: PathBuf },
}

fn main() {
    let cli = Cli::parse();

    let output = match cli.command {
        Commands::CheckConfig { path } => std::process::exit(check::run(path.as_deref())),
        Commands::ScanInbound { text } => inbound(&load_config(), &text),
        Commands::ScanOutbound { text } => {
            load_config();
            serde_json::to_string_pretty(&concierge_guard::scan_outbound(&text))
        }
        Commands::Extract { file } => {
            load_config();
            let content = std::fs::read_to_string(&file).unwrap_or_else(|e| {
                eprintln!("concierge: failed to read {}: {e}", file.display());
                std::process::exit(1);
            });
            let report = inspect::extract_report(&content).unwrap_or_else(|e| {
                eprintln!("concierge: {}: invalid transcript: {e}", file.display());
                std::process::exit(1);
            });
            serde_json::to_string_pretty(&report)
        }
    };

    match output {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("concierge: failed to render output: {e}");
            std::process::exit(1);
        }
    }
}

/// Loads configuration and installs logging. Exits on invalid config.
fn load_config() -> EngineConfig {
    match concierge_config::load_and_validate() {
        Ok(config) => {
            init_tracing(&config.log_level);
            config
        }
        Err(errors) => {
            concierge_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

fn inbound(config: &EngineConfig, text: &str) -> serde_json::Result<String> {
    let report = inspect::inbound_report(
        text,
        config.guard.block_threshold,
        config.guard.warn_threshold,
    );
    tracing::debug!(score = report.scan.score, blocked = report.scan.blocked, "inbound scan");
    serde_json::to_string_pretty(&report)
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("concierge={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}
