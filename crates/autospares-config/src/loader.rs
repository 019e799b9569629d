// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./autospares.toml` > `~/.config/autospares/autospares.toml`
//! > `/etc/autospares/autospares.toml`, with environment variable overrides via
//! the `AUTOSPARES_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::StoreConfig;

/// Config file name looked up in every hierarchy location.
pub const CONFIG_FILE_NAME: &str = "autospares.toml";

/// Top-level sections, used to turn `AUTOSPARES_MPESA_CONSUMER_KEY` into `mpesa.consumer_key`.
const SECTIONS: &[&str] = &[
    "server", "storage", "gemini", "mpesa", "chat", "checkout", "email",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/autospares/autospares.toml`
/// 3. `~/.config/autospares/autospares.toml`
/// 4. `./autospares.toml`
/// 5. `AUTOSPARES_*` environment variables
pub fn load_config() -> Result<StoreConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from an inline TOML string (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<StoreConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(StoreConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<StoreConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(StoreConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the layered Figment before extraction.
pub fn build_figment() -> Figment {
    let mut figment = Figment::new().merge(Serialized::defaults(StoreConfig::default()));
    for path in config_paths() {
        figment = figment.merge(Toml::file(path));
    }
    figment.merge(env_provider())
}

/// Config file locations in merge order (lowest precedence first).
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/autospares").join(CONFIG_FILE_NAME)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("autospares").join(CONFIG_FILE_NAME));
    }
    paths.push(PathBuf::from(CONFIG_FILE_NAME));
    paths
}

/// Environment provider mapping the first `_` after a known section to a dot.
///
/// Uses `Env::map()` rather than `Env::split("_")` so that keys containing
/// underscores survive: `AUTOSPARES_MPESA_CONSUMER_KEY` -> `mpesa.consumer_key`.
fn env_provider() -> Env {
    Env::prefixed("AUTOSPARES_").map(|key| map_env_key(key.as_str()).into())
}

fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_sections() {
        assert_eq!(map_env_key("mpesa_consumer_key"), "mpesa.consumer_key");
        assert_eq!(map_env_key("server_port"), "server.port");
        assert_eq!(
            map_env_key("checkout_free_shipping_threshold"),
            "checkout.free_shipping_threshold"
        );
        assert_eq!(map_env_key("unrelated"), "unrelated");
    }

    #[test]
    fn chat_prefix_does_not_swallow_checkout() {
        assert_eq!(map_env_key("checkout_tax_rate"), "checkout.tax_rate");
        assert_eq!(map_env_key("chat_history_limit"), "chat.history_limit");
    }

    #[test]
    fn config_paths_end_with_local_file() {
        let paths = config_paths();
        assert_eq!(paths.last().unwrap(), &PathBuf::from(CONFIG_FILE_NAME));
        assert!(paths[0].starts_with("/etc/autospares"));
    }
}
