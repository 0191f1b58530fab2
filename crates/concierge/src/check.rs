// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `concierge check-config`.

use std::path::Path;

use concierge_config::{ConfigError, EngineConfig};

/// Loads and validates configuration. Returns the process exit code.
pub fn run(path: Option<&Path>) -> i32 {
    match load(path) {
        Ok(config) => {
            println!("{}", summary(&config));
            0
        }
        Err(errors) => {
            concierge_config::render_errors(&errors);
            eprintln!("concierge: {} configuration problem(s)", errors.len());
            1
        }
    }
}

fn load(path: Option<&Path>) -> Result<EngineConfig, Vec<ConfigError>> {
    match path {
        Some(path) => concierge_config::load_and_validate_path(path),
        None => concierge_config::load_and_validate(),
    }
}

pub fn summary(config: &EngineConfig) -> String {
    let model = if config.llm.model.is_empty() {
        "<unset>"
    } else {
        config.llm.model.as_str()
    };
    format!(
        "configuration ok\n  model: {model}\n  history limit: {}\n  deposit default: ${:.2}\n  guard thresholds: block {} / warn {}\n  metrics: {}",
        config.transcript.max_history_messages,
        config.deposit.default_amount_cents as f64 / 100.0,
        config.guard.block_threshold,
        config.guard.warn_threshold,
        if config.metrics.enabled { "enabled" } else { "disabled" },
    )
}
