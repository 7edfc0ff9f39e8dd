// SPDX-FileCopyrightText: 2026 Orderping Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Orderping delivery engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Orderping configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OrderpingConfig {
    /// Engine identity and logging settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Session lifecycle settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Outbound delivery worker settings.
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// WhatsApp bridge daemon settings.
    #[serde(default)]
    pub bridge: BridgeConfig,
}

/// Engine identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Display name of this engine instance.
    #[serde(default = "default_engine_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: default_engine_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_engine_name() -> String {
    "orderping".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("orderping").join("orderping.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("orderping.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Session lifecycle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Delay before re-entering `connecting` after a transient closure.
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,

    /// Upper bound on one transport open attempt (the transport's own
    /// timeout; no extra application-level timeout wraps the connect flow).
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Transport keep-alive probe interval.
    #[serde(default = "default_keepalive_secs")]
    pub keepalive_secs: u64,

    /// Inter-tenant delay during startup reconciliation, to avoid a
    /// connection burst against upstream rate limits.
    #[serde(default = "default_reconcile_gap_secs")]
    pub reconcile_gap_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_secs: default_reconnect_delay_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            keepalive_secs: default_keepalive_secs(),
            reconcile_gap_secs: default_reconcile_gap_secs(),
        }
    }
}

fn default_reconnect_delay_secs() -> u64 {
    5
}

fn default_connect_timeout_secs() -> u64 {
    60
}

fn default_keepalive_secs() -> u64 {
    30
}

fn default_reconcile_gap_secs() -> u64 {
    3
}

/// Outbound delivery worker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DeliveryConfig {
    /// Maximum jobs in flight concurrently per process.
    #[serde(default = "default_worker_concurrency")]
    pub worker_concurrency: usize,

    /// Rolling cap on queue claims per wall-clock second.
    #[serde(default = "default_claims_per_second")]
    pub claims_per_second: u32,

    /// Base for exponential retry backoff (base × 2^attempts).
    #[serde(default = "default_retry_base_delay_secs")]
    pub retry_base_delay_secs: u64,

    /// How long a claimed job waits for its tenant's session to reach
    /// `connected` before the attempt fails.
    #[serde(default = "default_connect_wait_secs")]
    pub connect_wait_secs: u64,

    /// Idle poll interval when the queue has no due jobs.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Maximum media payload size fetched for a media message.
    #[serde(default = "default_media_max_bytes")]
    pub media_max_bytes: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            worker_concurrency: default_worker_concurrency(),
            claims_per_second: default_claims_per_second(),
            retry_base_delay_secs: default_retry_base_delay_secs(),
            connect_wait_secs: default_connect_wait_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            media_max_bytes: default_media_max_bytes(),
        }
    }
}

fn default_worker_concurrency() -> usize {
    5
}

fn default_claims_per_second() -> u32 {
    10
}

fn default_retry_base_delay_secs() -> u64 {
    30
}

fn default_connect_wait_secs() -> u64 {
    20
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_media_max_bytes() -> u64 {
    16 * 1024 * 1024
}

/// WhatsApp bridge daemon configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// Address of the bridge daemon's JSON-RPC socket.
    #[serde(default = "default_bridge_address")]
    pub address: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            address: default_bridge_address(),
        }
    }
}

fn default_bridge_address() -> String {
    "127.0.0.1:7465".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = OrderpingConfig::default();
        assert_eq!(config.engine.name, "orderping");
        assert_eq!(config.engine.log_level, "info");
        assert!(config.storage.wal_mode);
        assert_eq!(config.session.reconnect_delay_secs, 5);
        assert_eq!(config.session.reconcile_gap_secs, 3);
        assert_eq!(config.delivery.worker_concurrency, 5);
        assert_eq!(config.delivery.claims_per_second, 10);
    }

    #[test]
    fn unknown_top_level_key_is_rejected() {
        let toml_str = r#"
[engine]
name = "test"

[not_a_section]
x = 1
"#;
        assert!(toml::from_str::<OrderpingConfig>(toml_str).is_err());
    }

    #[test]
    fn unknown_section_key_is_rejected() {
        let toml_str = r#"
[delivery]
worker_concurency = 3
"#;
        assert!(toml::from_str::<OrderpingConfig>(toml_str).is_err());
    }

    #[test]
    fn partial_section_merges_with_defaults() {
        let toml_str = r#"
[delivery]
worker_concurrency = 2
"#;
        let config: OrderpingConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.delivery.worker_concurrency, 2);
        assert_eq!(config.delivery.claims_per_second, 10);
    }
}
