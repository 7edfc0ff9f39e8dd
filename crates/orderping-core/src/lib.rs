// SPDX-FileCopyrightText: 2026 Orderping Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Orderping delivery engine.
//!
//! This crate provides the foundational trait definitions, error types, and
//! common types used throughout the Orderping workspace. The transport,
//! storage, and billing adapters all implement traits defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::OrderpingError;
pub use types::{
    AdapterType, CloseReason, ConnectionState, CredentialSet, HealthStatus, MessageId,
    TenantId, TransportEvent,
};

// Re-export all adapter traits at crate root.
pub use traits::{
    BillingAdapter, PluginAdapter, StorageAdapter, Transport, TransportHandle,
    TransportLink,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orderping_error_has_all_variants() {
        // Verify all 8 error variants exist and can be constructed.
        let _config = OrderpingError::Config("test".into());
        let _storage = OrderpingError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _transport = OrderpingError::Transport {
            message: "test".into(),
            source: None,
        };
        let _media = OrderpingError::Media {
            message: "test".into(),
            source: None,
        };
        let _billing = OrderpingError::Billing {
            message: "test".into(),
        };
        let _not_connected = OrderpingError::NotConnected {
            tenant_id: "shop-a.example.com".into(),
        };
        let _timeout = OrderpingError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        let _internal = OrderpingError::Internal("test".into());
    }

    #[test]
    fn adapter_type_round_trips() {
        use std::str::FromStr;

        let variants = [
            AdapterType::Transport,
            AdapterType::Storage,
            AdapterType::Billing,
        ];
        for variant in &variants {
            let s = variant.to_string();
            let parsed = AdapterType::from_str(&s).expect("should parse back");
            assert_eq!(*variant, parsed);
        }
    }

    #[test]
    fn health_status_variants() {
        let healthy = HealthStatus::Healthy;
        let degraded = HealthStatus::Degraded("slow".into());
        let unhealthy = HealthStatus::Unhealthy("down".into());

        assert_eq!(healthy, HealthStatus::Healthy);
        assert_ne!(degraded, healthy);
        assert_ne!(unhealthy, healthy);
    }

    #[test]
    fn all_trait_modules_are_exported() {
        // If any trait module is missing or broken this test won't compile.
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_transport<T: Transport>() {}
        fn _assert_storage_adapter<T: StorageAdapter>() {}
        fn _assert_billing_adapter<T: BillingAdapter>() {}
    }
}
