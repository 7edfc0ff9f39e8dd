// SPDX-FileCopyrightText: 2026 Orderping Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Orderping integration tests.
//!
//! Provides a mock transport with scripted lifecycle events, a mock billing
//! adapter, and tempdir-backed storage fixtures.

pub mod harness;
pub mod mock_billing;
pub mod mock_transport;

pub use harness::{StorageFixture, fast_delivery_config, fast_session_config, sqlite_fixture};
pub use mock_billing::MockBilling;
pub use mock_transport::{MockLink, MockSession, MockTransport, SentMessage};
