// SPDX-FileCopyrightText: 2026 Orderping Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as non-empty paths and non-zero worker counts.

use crate::diagnostic::ConfigError;
use crate::model::OrderpingConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &OrderpingConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.delivery.worker_concurrency == 0 {
        errors.push(ConfigError::Validation {
            message: "delivery.worker_concurrency must be at least 1".to_string(),
        });
    }

    if config.delivery.claims_per_second == 0 {
        errors.push(ConfigError::Validation {
            message: "delivery.claims_per_second must be at least 1".to_string(),
        });
    }

    if config.delivery.retry_base_delay_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "delivery.retry_base_delay_secs must be at least 1".to_string(),
        });
    }

    if config.bridge.address.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "bridge.address must not be empty".to_string(),
        });
    }

    // Accept host:port; reject anything without a port to fail fast on the
    // common mistake of configuring just a hostname.
    if !config.bridge.address.trim().is_empty() {
        let addr = config.bridge.address.trim();
        if !addr.contains(':') {
            errors.push(ConfigError::Validation {
                message: format!("bridge.address `{addr}` must include a port"),
            });
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
