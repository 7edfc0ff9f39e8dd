// SPDX-FileCopyrightText: 2026 Orderping Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound delivery pipeline for the Orderping delivery engine.
//!
//! [`producer::enqueue`] is the fire-and-forget entry point for webhook and
//! campaign collaborators; [`worker::DeliveryWorker`] drains the durable
//! queue with bounded concurrency, a rolling claim limiter, media fallback,
//! and exponential-backoff retries.

pub mod limiter;
pub mod media;
pub mod producer;
pub mod worker;

pub use limiter::ClaimLimiter;
pub use media::MediaFetcher;
pub use producer::enqueue;
pub use worker::DeliveryWorker;
