// SPDX-FileCopyrightText: 2026 Orderping Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./orderping.toml` > `~/.config/orderping/orderping.toml`
//! > `/etc/orderping/orderping.toml` with environment variable overrides via
//! `ORDERPING_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::OrderpingConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/orderping/orderping.toml` (system-wide)
/// 3. `~/.config/orderping/orderping.toml` (user XDG config)
/// 4. `./orderping.toml` (local directory)
/// 5. `ORDERPING_*` environment variables
pub fn load_config() -> Result<OrderpingConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(OrderpingConfig::default()))
        .merge(Toml::file("/etc/orderping/orderping.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("orderping/orderping.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("orderping.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<OrderpingConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(OrderpingConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<OrderpingConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(OrderpingConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// CRITICAL: Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names. For example, `ORDERPING_STORAGE_DATABASE_PATH`
/// must map to `storage.database_path`, not `storage.database.path`.
fn env_provider() -> Env {
    Env::prefixed("ORDERPING_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: ORDERPING_DELIVERY_WORKER_CONCURRENCY -> "delivery_worker_concurrency"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("engine_", "engine.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("session_", "session.", 1)
            .replacen("delivery_", "delivery.", 1)
            .replacen("bridge_", "bridge.", 1);
        mapped.into()
    })
}
