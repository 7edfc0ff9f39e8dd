// SPDX-FileCopyrightText: 2026 Orderping Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Orderping engine.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Stable external identifier for one merchant/tenant (the store domain).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(pub String);

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TenantId {
    fn from(s: &str) -> Self {
        TenantId(s.to_string())
    }
}

/// Identifier assigned to a message by the transport after a successful send.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of adapter in the engine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Transport,
    Storage,
    Billing,
}

/// Lifecycle state of a tenant's protocol session.
///
/// Persisted as text in the status record; `Display`/`FromStr` round-trip
/// through the snake_case form used in the database.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No session; initial state and the terminal state after logout.
    Disconnected,
    /// A session open is in flight.
    Connecting,
    /// The transport emitted a pairing challenge; waiting for the operator.
    AwaitingPairing,
    /// The session is live and sends may proceed.
    Connected,
    /// The session closed unexpectedly; a reconnect may be scheduled.
    Error,
}

// --- Credential material ---

/// Serde adapter that encodes `Vec<u8>` fields as base64 text.
///
/// Credential structures embed raw key material; JSON cannot carry arbitrary
/// bytes, so every binary field goes through this module and must round-trip
/// exactly.
pub mod base64_bytes {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(de)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for optional binary fields, encoded as base64 when present.
pub mod base64_bytes_opt {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        bytes: &Option<Vec<u8>>,
        ser: S,
    ) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(b) => ser.serialize_some(&STANDARD.encode(b)),
            None => ser.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        de: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        let s: Option<String> = Option::deserialize(de)?;
        match s {
            Some(s) => STANDARD
                .decode(&s)
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}

/// A raw Curve25519 key pair used by the multi-device protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPair {
    #[serde(with = "base64_bytes")]
    pub public: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub secret: Vec<u8>,
}

impl KeyPair {
    /// Generate a random 32-byte key pair.
    ///
    /// The actual Curve25519 derivation happens inside the protocol client;
    /// here the pair is opaque seed material.
    pub fn generate() -> Self {
        use rand::RngCore;
        let mut rng = rand::thread_rng();
        let mut public = vec![0u8; 32];
        let mut secret = vec![0u8; 32];
        rng.fill_bytes(&mut public);
        rng.fill_bytes(&mut secret);
        Self { public, secret }
    }
}

/// The signed pre-key advertised to the server during pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedPreKey {
    pub key_id: u32,
    pub key: KeyPair,
    #[serde(with = "base64_bytes")]
    pub signature: Vec<u8>,
}

/// Complete protocol identity and session key material for one tenant.
///
/// This is the sole source of truth for resuming a session without
/// re-pairing. Mutated exclusively by the session manager in response to
/// credential-update events from the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSet {
    pub noise_key: KeyPair,
    pub identity_key: KeyPair,
    pub signed_pre_key: SignedPreKey,
    pub registration_id: u32,
    #[serde(with = "base64_bytes")]
    pub adv_secret: Vec<u8>,
    /// Account JID assigned by the server after a successful pairing.
    /// `None` means this identity has never completed pairing.
    #[serde(default)]
    pub account_jid: Option<String>,
    /// Signed device identity blob received during pairing.
    #[serde(default, with = "base64_bytes_opt")]
    pub device_identity: Option<Vec<u8>>,
}

impl CredentialSet {
    /// Create a fresh, never-paired credential identity with random keys.
    ///
    /// Used when no prior credentials exist or the stored blob is corrupt;
    /// connecting with a fresh identity always produces a pairing challenge.
    pub fn fresh() -> Self {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        Self {
            noise_key: KeyPair::generate(),
            identity_key: KeyPair::generate(),
            signed_pre_key: SignedPreKey {
                key_id: 1,
                key: KeyPair::generate(),
                signature: vec![0u8; 64],
            },
            registration_id: rng.gen_range(1..0x3FFF),
            adv_secret: {
                use rand::RngCore;
                let mut secret = vec![0u8; 32];
                rng.fill_bytes(&mut secret);
                secret
            },
            account_jid: None,
            device_identity: None,
        }
    }

    /// Whether this identity has completed pairing with the server.
    pub fn is_paired(&self) -> bool {
        self.account_jid.is_some()
    }
}

// --- Transport events ---

/// Reason a transport session closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// Remote-initiated sign-out. The stored credentials are now invalid
    /// and the tenant must re-pair.
    LoggedOut,
    /// Recoverable closure: network blip, upstream restart, timeout.
    Transient(String),
}

impl CloseReason {
    /// Terminal closures must not be retried automatically.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CloseReason::LoggedOut)
    }
}

/// Discrete events emitted by an open transport session.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A pairing challenge for an unpaired identity. Re-emitted with a new
    /// payload when the previous challenge expires.
    PairingCode(String),
    /// The connection is live.
    Opened,
    /// The connection closed.
    Closed(CloseReason),
    /// Updated key material that must be persisted immediately.
    CredentialsChanged(Box<CredentialSet>),
}

// --- Delivery queue ---

/// A queued outbound message, tracked from `pending` to `sent`/`failed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryJob {
    pub id: i64,
    pub tenant_id: String,
    pub recipient: String,
    pub body: String,
    pub media_url: Option<String>,
    pub category: String,
    pub order_ref: Option<String>,
    /// Lower value = more urgent.
    pub priority: i64,
    /// Earliest claim time; a future value makes the job ineligible.
    pub not_before: String,
    pub status: String,
    pub attempts: i64,
    pub max_attempts: i64,
    pub last_error: Option<String>,
    /// tenant + recipient + enqueue timestamp; identifies retried sends.
    pub dedupe_key: String,
    pub created_at: String,
    pub updated_at: String,
    pub locked_until: Option<String>,
}

/// Input for enqueuing a new delivery job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJob {
    pub tenant_id: String,
    pub recipient: String,
    pub body: String,
    #[serde(default)]
    pub media_url: Option<String>,
    pub category: String,
    #[serde(default)]
    pub order_ref: Option<String>,
    #[serde(default = "default_priority")]
    pub priority: i64,
    /// RFC 3339 timestamp; `None` means eligible immediately.
    #[serde(default)]
    pub not_before: Option<String>,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: i64,
}

fn default_priority() -> i64 {
    5
}

fn default_max_attempts() -> i64 {
    3
}

// --- Delivery history ---

/// One terminal attempt outcome in the append-only history log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub id: i64,
    pub tenant_id: String,
    pub recipient: String,
    pub body: String,
    pub category: String,
    pub order_ref: Option<String>,
    /// `"sent"` or `"failed"`.
    pub outcome: String,
    pub error: Option<String>,
    pub created_at: String,
}

/// Input for appending a history record.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub tenant_id: String,
    pub recipient: String,
    pub body: String,
    pub category: String,
    pub order_ref: Option<String>,
    pub outcome: String,
    pub error: Option<String>,
}

// --- Connection status projection ---

/// Durable, pollable projection of a tenant's session lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub tenant_id: String,
    pub connection_state: ConnectionState,
    /// Present only while `connection_state` is `awaiting_pairing`.
    pub pairing_code: Option<String>,
    /// Set on each transition into `connected`.
    pub last_connected_at: Option<String>,
    pub updated_at: String,
}

// --- Billing ---

/// Outcome of a quota check from the billing collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaDecision {
    pub allowed: bool,
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn connection_state_round_trips_through_text() {
        let states = [
            ConnectionState::Disconnected,
            ConnectionState::Connecting,
            ConnectionState::AwaitingPairing,
            ConnectionState::Connected,
            ConnectionState::Error,
        ];
        for state in states {
            let s = state.to_string();
            let parsed = ConnectionState::from_str(&s).expect("should parse back");
            assert_eq!(state, parsed);
        }
        assert_eq!(
            ConnectionState::AwaitingPairing.to_string(),
            "awaiting_pairing"
        );
    }

    #[test]
    fn fresh_credentials_are_unpaired() {
        let creds = CredentialSet::fresh();
        assert!(!creds.is_paired());
        assert_eq!(creds.noise_key.public.len(), 32);
        assert_eq!(creds.identity_key.secret.len(), 32);
        assert!(creds.registration_id >= 1 && creds.registration_id < 0x3FFF);
    }

    #[test]
    fn fresh_credentials_have_distinct_keys() {
        let a = CredentialSet::fresh();
        let b = CredentialSet::fresh();
        assert_ne!(a.noise_key, b.noise_key);
        assert_ne!(a.identity_key, b.identity_key);
    }

    #[test]
    fn close_reason_terminality() {
        assert!(CloseReason::LoggedOut.is_terminal());
        assert!(!CloseReason::Transient("stream ended".into()).is_terminal());
    }

    #[test]
    fn credential_set_serializes_binary_fields_as_base64() {
        let mut creds = CredentialSet::fresh();
        creds.noise_key.public = vec![0x00, 0xFF, 0x10, 0x80];
        let json = serde_json::to_value(&creds).unwrap();
        // Raw bytes must appear as a base64 string, not a JSON array.
        assert!(json["noise_key"]["public"].is_string());
    }

    mod credential_round_trip {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // For all valid credential structures, JSON encoding round-trips
            // exactly, including embedded binary key fields.
            #[test]
            fn json_round_trips_exactly(
                public in proptest::collection::vec(any::<u8>(), 32),
                secret in proptest::collection::vec(any::<u8>(), 32),
                signature in proptest::collection::vec(any::<u8>(), 64),
                adv_secret in proptest::collection::vec(any::<u8>(), 0..64),
                registration_id in 1u32..0x3FFF,
                key_id in any::<u32>(),
                paired in any::<bool>(),
            ) {
                let creds = CredentialSet {
                    noise_key: KeyPair { public: public.clone(), secret: secret.clone() },
                    identity_key: KeyPair { public: secret, secret: public },
                    signed_pre_key: SignedPreKey {
                        key_id,
                        key: KeyPair::generate(),
                        signature,
                    },
                    registration_id,
                    adv_secret,
                    account_jid: paired.then(|| "15550001111@s.whatsapp.net".to_string()),
                    device_identity: paired.then(|| vec![0x00, 0xFF, 0x80]),
                };
                let json = serde_json::to_string(&creds).unwrap();
                let decoded: CredentialSet = serde_json::from_str(&json).unwrap();
                prop_assert_eq!(creds, decoded);
            }
        }
    }

    #[test]
    fn new_job_defaults_apply() {
        let job: NewJob = serde_json::from_str(
            r#"{"tenant_id":"shop-a","recipient":"15550001111","body":"hi","category":"order_confirmation"}"#,
        )
        .unwrap();
        assert_eq!(job.priority, 5);
        assert_eq!(job.max_attempts, 3);
        assert!(job.not_before.is_none());
        assert!(job.media_url.is_none());
    }
}
