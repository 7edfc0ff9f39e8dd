// SPDX-FileCopyrightText: 2026 Orderping Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock billing adapter with an in-memory usage counter.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use orderping_core::types::{AdapterType, HealthStatus, QuotaDecision};
use orderping_core::{BillingAdapter, OrderpingError, PluginAdapter};

/// In-memory [`BillingAdapter`] for tests.
///
/// Usage is tallied per tenant; `deny` flips quota checks to rejection.
pub struct MockBilling {
    usage: Mutex<HashMap<String, u64>>,
    deny: AtomicBool,
}

impl MockBilling {
    pub fn new() -> Self {
        Self {
            usage: Mutex::new(HashMap::new()),
            deny: AtomicBool::new(false),
        }
    }

    /// Make subsequent `can_send` calls return a denial.
    pub fn deny(&self) {
        self.deny.store(true, Ordering::SeqCst);
    }

    /// Total usage recorded for a tenant.
    pub async fn usage(&self, tenant_id: &str) -> u64 {
        self.usage.lock().await.get(tenant_id).copied().unwrap_or(0)
    }
}

impl Default for MockBilling {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockBilling {
    fn name(&self) -> &str {
        "mock-billing"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Billing
    }

    async fn health_check(&self) -> Result<HealthStatus, OrderpingError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), OrderpingError> {
        Ok(())
    }
}

#[async_trait]
impl BillingAdapter for MockBilling {
    async fn can_send(
        &self,
        _tenant_id: &str,
        _count: u32,
    ) -> Result<QuotaDecision, OrderpingError> {
        if self.deny.load(Ordering::SeqCst) {
            Ok(QuotaDecision {
                allowed: false,
                reason: Some("plan limit reached".to_string()),
            })
        } else {
            Ok(QuotaDecision {
                allowed: true,
                reason: None,
            })
        }
    }

    async fn increment_usage(
        &self,
        tenant_id: &str,
        count: u32,
    ) -> Result<(), OrderpingError> {
        *self
            .usage
            .lock()
            .await
            .entry(tenant_id.to_string())
            .or_insert(0) += u64::from(count);
        Ok(())
    }
}
