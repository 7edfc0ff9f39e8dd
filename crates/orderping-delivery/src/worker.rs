// SPDX-FileCopyrightText: 2026 Orderping Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound delivery worker pool.
//!
//! Claims due jobs in priority order and processes each in its own task,
//! bounded by a semaphore (in-flight cap) and the rolling claim limiter.
//! A failing tenant never blocks other tenants' jobs: the claim loop keeps
//! running while attempts execute concurrently.
//!
//! Per job: ensure a connected session (awaiting the explicit ready signal,
//! not a fixed sleep), fetch media with text fallback, send, then record the
//! terminal outcome exactly once -- `sent` history + usage metering + ack,
//! or `failed` history + retry scheduling with exponential backoff.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use orderping_config::model::DeliveryConfig;
use orderping_core::types::{DeliveryJob, NewRecord};
use orderping_core::{BillingAdapter, OrderpingError, StorageAdapter};
use orderping_session::SessionManager;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::limiter::ClaimLimiter;
use crate::media::MediaFetcher;

/// The delivery worker pool. One instance per process.
pub struct DeliveryWorker {
    storage: Arc<dyn StorageAdapter>,
    sessions: SessionManager,
    billing: Arc<dyn BillingAdapter>,
    media: MediaFetcher,
    limiter: ClaimLimiter,
    in_flight: Arc<Semaphore>,
    config: DeliveryConfig,
    shutdown: CancellationToken,
}

impl DeliveryWorker {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        sessions: SessionManager,
        billing: Arc<dyn BillingAdapter>,
        config: DeliveryConfig,
        shutdown: CancellationToken,
    ) -> Result<Self, OrderpingError> {
        Ok(Self {
            storage,
            sessions,
            billing,
            media: MediaFetcher::new(config.media_max_bytes)?,
            limiter: ClaimLimiter::new(config.claims_per_second),
            in_flight: Arc::new(Semaphore::new(config.worker_concurrency)),
            config,
            shutdown,
        })
    }

    /// Run the claim loop until shutdown, then drain in-flight sends.
    ///
    /// On shutdown no new jobs are claimed; jobs already in flight finish
    /// or fail naturally before this returns.
    pub async fn run(self: Arc<Self>) {
        info!(
            concurrency = self.config.worker_concurrency,
            claims_per_second = self.config.claims_per_second,
            "delivery worker started"
        );

        loop {
            // Take an in-flight slot before claiming so a full pool
            // back-pressures the queue instead of over-claiming.
            let permit = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                permit = Arc::clone(&self.in_flight).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = self.limiter.acquire() => {}
            }

            match self.storage.claim_due_job().await {
                Ok(Some(job)) => {
                    let worker = Arc::clone(&self);
                    tokio::spawn(async move {
                        worker.process(job).await;
                        drop(permit);
                    });
                }
                Ok(None) => {
                    drop(permit);
                    tokio::select! {
                        _ = self.shutdown.cancelled() => break,
                        _ = tokio::time::sleep(Duration::from_millis(self.config.poll_interval_ms)) => {}
                    }
                }
                Err(e) => {
                    error!(error = %e, "queue claim failed");
                    drop(permit);
                    tokio::select! {
                        _ = self.shutdown.cancelled() => break,
                        _ = tokio::time::sleep(Duration::from_millis(self.config.poll_interval_ms)) => {}
                    }
                }
            }
        }

        // Drain: once every permit is back, no sends are in flight.
        let _ = self
            .in_flight
            .acquire_many(self.config.worker_concurrency as u32)
            .await;
        info!("delivery worker drained");
    }

    /// Execute one claimed job and record its terminal outcome exactly once.
    async fn process(&self, job: DeliveryJob) {
        debug!(
            job_id = job.id,
            tenant_id = %job.tenant_id,
            category = %job.category,
            attempt = job.attempts + 1,
            "processing delivery job"
        );

        match self.attempt(&job).await {
            Ok(()) => {
                self.record_outcome(&job, "sent", None).await;
                if let Err(e) = self.billing.increment_usage(&job.tenant_id, 1).await {
                    warn!(tenant_id = %job.tenant_id, error = %e, "usage metering failed");
                }
                if let Err(e) = self.storage.ack_job(job.id).await {
                    error!(job_id = job.id, error = %e, "job ack failed");
                }
                counter!("orderping_delivery_sent_total").increment(1);
                info!(
                    job_id = job.id,
                    tenant_id = %job.tenant_id,
                    recipient = %job.recipient,
                    "message delivered"
                );
            }
            Err(e) => {
                let error_text = e.to_string();
                self.record_outcome(&job, "failed", Some(&error_text)).await;
                if let Err(e) = self
                    .storage
                    .fail_job(job.id, &error_text, self.config.retry_base_delay_secs as i64)
                    .await
                {
                    error!(job_id = job.id, error = %e, "job failure bookkeeping failed");
                }
                counter!("orderping_delivery_failed_total").increment(1);
                warn!(
                    job_id = job.id,
                    tenant_id = %job.tenant_id,
                    attempt = job.attempts + 1,
                    max_attempts = job.max_attempts,
                    error = %error_text,
                    "delivery attempt failed"
                );
            }
        }
    }

    /// One delivery attempt: connected session, optional media, send.
    async fn attempt(&self, job: &DeliveryJob) -> Result<(), OrderpingError> {
        // Quota was checked (if at all) at enqueue time by the producer;
        // there is deliberately no send-time gate here.
        debug!(tenant_id = %job.tenant_id, "sending without a send-time quota check");

        let session = self.sessions.request_connect(&job.tenant_id).await?;
        session
            .await_connected(Duration::from_secs(self.config.connect_wait_secs))
            .await?;
        let link = session
            .link()
            .await
            .ok_or_else(|| OrderpingError::NotConnected {
                tenant_id: job.tenant_id.clone(),
            })?;

        match &job.media_url {
            Some(url) => match self.media.fetch(url).await {
                Ok(bytes) => {
                    link.send_media(&job.recipient, bytes, &job.body).await?;
                }
                Err(e) => {
                    // Media trouble degrades to text; it never fails the job.
                    warn!(
                        job_id = job.id,
                        url = %url,
                        error = %e,
                        "media fetch failed, falling back to text-only send"
                    );
                    counter!("orderping_delivery_media_fallback_total").increment(1);
                    link.send_text(&job.recipient, &job.body).await?;
                }
            },
            None => {
                link.send_text(&job.recipient, &job.body).await?;
            }
        }

        Ok(())
    }

    /// History append failures are logged, never fatal to the job outcome.
    async fn record_outcome(&self, job: &DeliveryJob, outcome: &str, error: Option<&str>) {
        let record = NewRecord {
            tenant_id: job.tenant_id.clone(),
            recipient: job.recipient.clone(),
            body: job.body.clone(),
            category: job.category.clone(),
            order_ref: job.order_ref.clone(),
            outcome: outcome.to_string(),
            error: error.map(|e| e.to_string()),
        };
        if let Err(e) = self.storage.append_record(&record).await {
            error!(job_id = job.id, error = %e, "history record append failed");
        }
    }
}
