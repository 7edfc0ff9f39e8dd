// SPDX-FileCopyrightText: 2026 Orderping Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `orderping serve` command implementation.
//!
//! Wires the engine together: sqlite storage, the bridge transport, the
//! session manager and registry, the delivery worker pool, and startup
//! reconciliation. Supports graceful shutdown via SIGTERM/SIGINT: claiming
//! stops, in-flight sends finish naturally, sessions are torn down without
//! disturbing their durable `connected` status, then the WAL is
//! checkpointed.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use orderping_bridge::BridgeTransport;
use orderping_config::model::OrderpingConfig;
use orderping_core::types::{AdapterType, HealthStatus, QuotaDecision};
use orderping_core::{
    BillingAdapter, OrderpingError, PluginAdapter, StorageAdapter, Transport,
};
use orderping_delivery::DeliveryWorker;
use orderping_session::{SessionManager, SessionRegistry, reconcile};
use orderping_storage::SqliteStore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Runs the `orderping serve` command.
pub async fn run_serve(config: OrderpingConfig) -> Result<(), OrderpingError> {
    init_tracing(&config.engine.log_level);
    info!(name = %config.engine.name, "starting orderping serve");

    // Storage first; everything else hangs off it.
    let storage = SqliteStore::new(config.storage.clone());
    storage.initialize().await?;
    let storage: Arc<dyn StorageAdapter> = Arc::new(storage);

    // The bridge daemon owns the protocol; warn early if it is down, but
    // keep serving -- sessions will surface open failures per tenant.
    let transport = BridgeTransport::new(config.bridge.clone(), config.session.clone());
    match transport.health_check().await? {
        HealthStatus::Healthy => debug!("bridge daemon reachable"),
        HealthStatus::Degraded(reason) | HealthStatus::Unhealthy(reason) => {
            warn!(reason = %reason, "bridge daemon not reachable at startup");
        }
    }
    let transport: Arc<dyn Transport> = Arc::new(transport);

    let registry = Arc::new(SessionRegistry::new());
    let manager = SessionManager::new(
        registry,
        transport,
        Arc::clone(&storage),
        config.session.clone(),
    );

    let shutdown = install_signal_handler();

    // Startup reconciliation runs in the background so delivery starts
    // immediately; it paces itself with the configured inter-tenant gap.
    {
        let manager = manager.clone();
        let storage = Arc::clone(&storage);
        let gap = Duration::from_secs(config.session.reconcile_gap_secs);
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) =
                reconcile::reconcile_on_startup(&manager, &storage, gap, &shutdown).await
            {
                error!(error = %e, "startup reconciliation failed");
            }
        });
    }

    // Quota enforcement lives in the storefront app at enqueue time; the
    // engine side only meters sends.
    let billing: Arc<dyn BillingAdapter> = Arc::new(MeteredBilling);

    let worker = Arc::new(DeliveryWorker::new(
        Arc::clone(&storage),
        manager.clone(),
        billing,
        config.delivery.clone(),
        shutdown.clone(),
    )?);
    let worker_handle = tokio::spawn(Arc::clone(&worker).run());

    info!("orderping serving");
    shutdown.cancelled().await;
    info!("shutdown signal received, draining");

    // Worker drains in-flight sends, then sessions come down without
    // touching their durable status (so reconciliation reconnects them on
    // the next boot).
    if let Err(e) = worker_handle.await {
        warn!(error = %e, "delivery worker task join failed");
    }
    manager.shutdown().await;
    if let Err(e) = storage.close().await {
        warn!(error = %e, "storage close failed");
    }

    info!("orderping stopped");
    Ok(())
}

/// Initializes the tracing subscriber with env-filter support.
///
/// `RUST_LOG` overrides the configured level when set.
fn init_tracing(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Installs signal handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal is
/// received.
fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            let mut sigterm =
                signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

            tokio::select! {
                _ = ctrl_c => {
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
                _ = sigterm.recv() => {
                    info!("received SIGTERM, initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

/// Billing adapter used by the standalone engine: always allows, and meters
/// usage into logs and a counter. The storefront app enforces plan quotas
/// at enqueue time before jobs ever reach this process.
struct MeteredBilling;

#[async_trait]
impl PluginAdapter for MeteredBilling {
    fn name(&self) -> &str {
        "metered"
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
impl BillingAdapter for MeteredBilling {
    async fn can_send(
        &self,
        _tenant_id: &str,
        _count: u32,
    ) -> Result<QuotaDecision, OrderpingError> {
        Ok(QuotaDecision {
            allowed: true,
            reason: None,
        })
    }

    async fn increment_usage(
        &self,
        tenant_id: &str,
        count: u32,
    ) -> Result<(), OrderpingError> {
        metrics::counter!("orderping_usage_total").increment(u64::from(count));
        info!(tenant_id = %tenant_id, count, "usage metered");
        Ok(())
    }
}
