// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./atendo.toml` > `~/.config/atendo/atendo.toml` >
//! `/etc/atendo/atendo.toml` with environment variable overrides via the
//! `ATENDO_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::AtendoConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/atendo/atendo.toml` (system-wide)
/// 3. `~/.config/atendo/atendo.toml` (user XDG config)
/// 4. `./atendo.toml` (local directory)
/// 5. `ATENDO_*` environment variables
pub fn load_config() -> Result<AtendoConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AtendoConfig::default()))
        .merge(Toml::file("/etc/atendo/atendo.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("atendo/atendo.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("atendo.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<AtendoConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AtendoConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<AtendoConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AtendoConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `ATENDO_STORAGE_DATABASE_PATH` must map
/// to `storage.database_path`, not `storage.database.path`.
fn env_provider() -> Env {
    Env::prefixed("ATENDO_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        let mapped = key
            .as_str()
            .replacen("hub_", "hub.", 1)
            .replacen("server_", "server.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("prometheus_", "prometheus.", 1);
        mapped.into()
    })
}
