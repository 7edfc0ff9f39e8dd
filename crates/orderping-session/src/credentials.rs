// SPDX-FileCopyrightText: 2026 Orderping Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential store: binary-safe encoding of protocol key material plus the
//! degrade-to-fresh load path.
//!
//! The stored blob is JSON with every embedded byte array base64-encoded
//! (see `orderping_core::types::base64_bytes`), so raw key material survives
//! the text column exactly. A missing or corrupt blob is equivalent to
//! "never paired": `load` produces a fresh identity instead of failing.

use std::sync::Arc;

use orderping_core::types::CredentialSet;
use orderping_core::{OrderpingError, StorageAdapter};
use tracing::{debug, warn};

/// Persistence facade for per-tenant credential blobs.
#[derive(Clone)]
pub struct CredentialStore {
    storage: Arc<dyn StorageAdapter>,
}

impl CredentialStore {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self { storage }
    }

    /// Encode a credential set into the stored blob form.
    pub fn encode(creds: &CredentialSet) -> Result<String, OrderpingError> {
        serde_json::to_string(creds)
            .map_err(|e| OrderpingError::Internal(format!("credential encode failed: {e}")))
    }

    /// Decode a stored blob back into a credential set.
    pub fn decode(blob: &str) -> Result<CredentialSet, OrderpingError> {
        serde_json::from_str(blob)
            .map_err(|e| OrderpingError::Internal(format!("credential decode failed: {e}")))
    }

    /// Load the tenant's credentials, degrading to a fresh identity.
    ///
    /// Absent blob, corrupt blob, and storage read failures all produce a
    /// fresh (unpaired) credential set; connecting with it yields a pairing
    /// challenge, which is the correct recovery in every one of those cases.
    pub async fn load(&self, tenant_id: &str) -> CredentialSet {
        match self.storage.load_credentials(tenant_id).await {
            Ok(Some(blob)) => match Self::decode(&blob) {
                Ok(creds) => {
                    debug!(tenant_id = %tenant_id, paired = creds.is_paired(), "credentials loaded");
                    creds
                }
                Err(e) => {
                    warn!(
                        tenant_id = %tenant_id,
                        error = %e,
                        "stored credentials are corrupt, starting fresh (re-pairing required)"
                    );
                    CredentialSet::fresh()
                }
            },
            Ok(None) => {
                debug!(tenant_id = %tenant_id, "no stored credentials, starting fresh");
                CredentialSet::fresh()
            }
            Err(e) => {
                warn!(
                    tenant_id = %tenant_id,
                    error = %e,
                    "credential load failed, treating tenant as unpaired"
                );
                CredentialSet::fresh()
            }
        }
    }

    /// Persist the tenant's credentials. Last write wins.
    pub async fn save(
        &self,
        tenant_id: &str,
        creds: &CredentialSet,
    ) -> Result<(), OrderpingError> {
        let blob = Self::encode(creds)?;
        self.storage.save_credentials(tenant_id, &blob).await
    }

    /// Delete the tenant's credentials, forcing re-pairing on next connect.
    pub async fn wipe(&self, tenant_id: &str) -> Result<(), OrderpingError> {
        self.storage.delete_credentials(tenant_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orderping_core::types::{KeyPair, SignedPreKey};

    fn creds_with_awkward_bytes() -> CredentialSet {
        // Exercise bytes that would corrupt a non-binary-safe encoding:
        // NULs, high bytes, and values that look like UTF-8 continuation.
        let mut creds = CredentialSet::fresh();
        creds.noise_key = KeyPair {
            public: vec![0x00, 0xFF, 0x80, 0xC3, 0x28, 0x00],
            secret: (0u8..=255).collect(),
        };
        creds.signed_pre_key = SignedPreKey {
            key_id: 7,
            key: KeyPair {
                public: vec![0xDE, 0xAD, 0xBE, 0xEF],
                secret: vec![0x00; 32],
            },
            signature: vec![0xFF; 64],
        };
        creds.adv_secret = vec![0x01, 0x00, 0xFE];
        creds.account_jid = Some("15550001111@s.whatsapp.net".to_string());
        creds.device_identity = Some(vec![0x80, 0x81, 0x82]);
        creds
    }

    #[test]
    fn encode_decode_round_trips_exactly() {
        let creds = creds_with_awkward_bytes();
        let blob = CredentialStore::encode(&creds).unwrap();
        let decoded = CredentialStore::decode(&blob).unwrap();
        assert_eq!(creds, decoded);
    }

    #[test]
    fn round_trip_preserves_fresh_identities() {
        for _ in 0..8 {
            let creds = CredentialSet::fresh();
            let blob = CredentialStore::encode(&creds).unwrap();
            assert_eq!(CredentialStore::decode(&blob).unwrap(), creds);
        }
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(CredentialStore::decode("not json").is_err());
        assert!(CredentialStore::decode(r#"{"noise_key": 42}"#).is_err());
    }

    #[test]
    fn blob_is_plain_text() {
        // The blob goes into a TEXT column; it must never contain raw bytes.
        let blob = CredentialStore::encode(&creds_with_awkward_bytes()).unwrap();
        assert!(blob.is_ascii());
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn corrupt_blob_degrades_to_fresh_with_warning() {
        let fixture = orderping_test_utils::sqlite_fixture().await;
        fixture
            .storage
            .save_credentials("shop-a", "{{{ not json")
            .await
            .unwrap();

        let store = CredentialStore::new(Arc::clone(&fixture.storage));
        let creds = store.load("shop-a").await;

        // A fresh unpaired identity, and the operator can see why.
        assert!(!creds.is_paired());
        assert!(logs_contain("corrupt"));
    }

    #[tokio::test]
    async fn absent_blob_yields_fresh_identity() {
        let fixture = orderping_test_utils::sqlite_fixture().await;
        let store = CredentialStore::new(Arc::clone(&fixture.storage));
        let creds = store.load("never-saved").await;
        assert!(!creds.is_paired());
    }

    #[tokio::test]
    async fn save_then_load_round_trips_through_storage() {
        let fixture = orderping_test_utils::sqlite_fixture().await;
        let store = CredentialStore::new(Arc::clone(&fixture.storage));

        let creds = creds_with_awkward_bytes();
        store.save("shop-a", &creds).await.unwrap();
        assert_eq!(store.load("shop-a").await, creds);

        store.wipe("shop-a").await.unwrap();
        assert!(!store.load("shop-a").await.is_paired());
    }
}
