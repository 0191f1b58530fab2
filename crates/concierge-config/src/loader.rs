// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered loading with Figment.
//!
//! Later layers win: compiled defaults, `/etc/concierge/concierge.toml`,
//! the user config dir, `./concierge.toml`, then `CONCIERGE_*` variables.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use tracing::{debug, warn};

use crate::model::EngineConfig;

pub const SYSTEM_CONFIG_PATH: &str = "/etc/concierge/concierge.toml";
pub const LOCAL_CONFIG_PATH: &str = "concierge.toml";

const SECTIONS: &[&str] = &[
    "llm",
    "transcript",
    "deposit",
    "scheduling",
    "guard",
    "booking",
    "prompts",
    "metrics",
];

/// `~/.config/concierge/concierge.toml` on Linux.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("concierge/concierge.toml"))
}

pub fn build_figment() -> Figment {
    let user = user_config_path().unwrap_or_default();
    for layer in [Path::new(SYSTEM_CONFIG_PATH), user.as_path(), Path::new(LOCAL_CONFIG_PATH)] {
        if layer.is_file() {
            debug!(path = %layer.display(), "config layer found");
        }
    }
    Figment::new()
        .merge(Serialized::defaults(EngineConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user))
        .merge(Toml::file(LOCAL_CONFIG_PATH))
        .merge(env_provider())
}

pub fn load_config() -> Result<EngineConfig, figment::Error> {
    build_figment().extract()
}

/// Defaults plus one TOML string. No files, no environment.
pub fn load_config_from_str(toml_content: &str) -> Result<EngineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(EngineConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Defaults, one file, then environment overrides.
///
/// A missing file is not an error; the defaults apply.
pub fn load_config_from_path(path: &Path) -> Result<EngineConfig, figment::Error> {
    if !path.is_file() {
        warn!(path = %path.display(), "config file not found, using defaults");
    }
    Figment::new()
        .merge(Serialized::defaults(EngineConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Maps `CONCIERGE_LLM_REPLY_TIMEOUT_SECS` to `llm.reply_timeout_secs`.
///
/// Only the leading section name becomes a dot; underscores inside key
/// names are kept.
fn env_provider() -> Env {
    Env::prefixed("CONCIERGE_").map(|key| map_env_key(key.as_str()).into())
}

pub fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
