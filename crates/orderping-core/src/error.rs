// SPDX-FileCopyrightText: 2026 Orderping Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Orderping delivery engine.

use thiserror::Error;

/// The primary error type used across all Orderping adapter traits and core operations.
#[derive(Debug, Error)]
pub enum OrderpingError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Transport errors (session open failure, send failure, protocol violation).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Media resource errors (fetch failure, oversized payload).
    ///
    /// Distinct from [`Transport`](OrderpingError::Transport) because the
    /// delivery worker degrades to a text-only send on media errors instead
    /// of failing the job.
    #[error("media error: {message}")]
    Media {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Quota or usage-metering errors from the billing collaborator.
    #[error("billing error: {message}")]
    Billing { message: String },

    /// No live connected session exists for the tenant.
    #[error("tenant {tenant_id} has no connected session")]
    NotConnected { tenant_id: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
