// SPDX-FileCopyrightText: 2026 Orderping Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end engine test: pair a merchant, deliver an order notification,
//! survive a disconnect, and erase the tenant.

use std::sync::Arc;
use std::time::Duration;

use orderping_core::types::{ConnectionState, NewJob};
use orderping_core::{BillingAdapter, StorageAdapter, Transport};
use orderping_delivery::DeliveryWorker;
use orderping_session::{SessionManager, SessionRegistry};
use orderping_test_utils::{
    MockBilling, MockTransport, fast_delivery_config, fast_session_config, sqlite_fixture,
};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn merchant_pairs_delivers_and_erases() {
    let fixture = sqlite_fixture().await;
    let storage: Arc<dyn StorageAdapter> = Arc::clone(&fixture.storage);
    let transport = Arc::new(MockTransport::new());
    let billing = Arc::new(MockBilling::new());
    let shutdown = CancellationToken::new();

    let manager = SessionManager::new(
        Arc::new(SessionRegistry::new()),
        Arc::clone(&transport) as Arc<dyn Transport>,
        Arc::clone(&storage),
        fast_session_config(),
    );
    let worker = Arc::new(
        DeliveryWorker::new(
            Arc::clone(&storage),
            manager.clone(),
            Arc::clone(&billing) as Arc<dyn BillingAdapter>,
            fast_delivery_config(),
            shutdown.clone(),
        )
        .unwrap(),
    );
    let worker_handle = tokio::spawn(Arc::clone(&worker).run());

    // 1. Merchant installs the app and connects: a pairing code appears.
    let session = manager.request_connect("maple-goods.example.com").await.unwrap();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let status = manager.get_status("maple-goods.example.com").await.unwrap();
        if let Some(s) = status
            && s.connection_state == ConnectionState::AwaitingPairing
        {
            assert!(s.pairing_code.is_some());
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "no pairing code");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    // 2. The merchant scans the code; the session connects.
    transport
        .last_session()
        .await
        .unwrap()
        .complete_pairing("15550009999@s.whatsapp.net")
        .await;
    session.await_connected(Duration::from_secs(2)).await.unwrap();

    // 3. An order webhook enqueues a confirmation; the worker delivers it.
    let job_id = orderping_delivery::enqueue(
        &storage,
        NewJob {
            tenant_id: "maple-goods.example.com".to_string(),
            recipient: "15550001111".to_string(),
            body: "Thanks! Order #1042 is confirmed.".to_string(),
            media_url: None,
            category: "order_confirmation".to_string(),
            order_ref: Some("#1042".to_string()),
            priority: 1,
            not_before: None,
            max_attempts: 3,
        },
    )
    .await
    .unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if storage.get_job(job_id).await.unwrap().unwrap().status == "sent" {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "job never sent");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let records = storage
        .list_records("maple-goods.example.com", None)
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].outcome, "sent");
    assert_eq!(records[0].order_ref.as_deref(), Some("#1042"));
    assert_eq!(billing.usage("maple-goods.example.com").await, 1);

    // 4. Uninstall: everything about the tenant disappears.
    manager.erase_tenant("maple-goods.example.com").await.unwrap();
    assert!(
        storage
            .load_credentials("maple-goods.example.com")
            .await
            .unwrap()
            .is_none()
    );
    assert!(
        storage
            .list_records("maple-goods.example.com", None)
            .await
            .unwrap()
            .is_empty()
    );
    assert!(
        storage
            .get_status("maple-goods.example.com")
            .await
            .unwrap()
            .is_none()
    );

    shutdown.cancel();
    worker_handle.await.unwrap();
}
