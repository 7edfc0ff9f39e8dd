// SPDX-FileCopyrightText: 2026 Orderping Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Billing adapter trait for quota checks and usage metering.

use async_trait::async_trait;

use crate::error::OrderpingError;
use crate::traits::adapter::PluginAdapter;
use crate::types::QuotaDecision;

/// Adapter for the billing collaborator.
///
/// Quota enforcement happens at enqueue time in the producers; the delivery
/// worker only meters usage after successful sends.
#[async_trait]
pub trait BillingAdapter: PluginAdapter {
    /// Whether the tenant may send `count` more messages under its plan.
    async fn can_send(&self, tenant_id: &str, count: u32)
    -> Result<QuotaDecision, OrderpingError>;

    /// Add `count` sent messages to the tenant's usage counter.
    async fn increment_usage(&self, tenant_id: &str, count: u32)
    -> Result<(), OrderpingError>;
}
