// SPDX-FileCopyrightText: 2026 Orderping Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pure state machine for the per-tenant session lifecycle.
//!
//! [`handle_event`] is a pure function from (state, event) to (next state,
//! effects). The driver task in [`crate::manager`] adapts the transport's
//! event stream into [`SessionEvent`] values and interprets the returned
//! effects; nothing in this module touches the network or the database,
//! which keeps every transition testable in isolation.

use orderping_core::types::{CloseReason, ConnectionState, CredentialSet};

/// Input events for the session state machine.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Explicit connect request from a caller (UI action, delivery worker,
    /// startup reconciliation).
    ConnectRequested,
    /// The transport emitted a pairing challenge. Re-delivered with a new
    /// payload when the previous challenge expires.
    PairingCode(String),
    /// The transport confirmed the connection is live.
    Opened,
    /// The transport reported closure.
    Closed(CloseReason),
    /// The transport rotated key material.
    CredentialsChanged(Box<CredentialSet>),
    /// Explicit disconnect request from a caller.
    DisconnectRequested {
        /// User-initiated logout always wipes; transient teardown keeps the
        /// credentials for a later resume.
        wipe_credentials: bool,
    },
}

/// Side effects the driver must execute after a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Load credentials and open a transport session.
    OpenTransport,
    /// Upsert the status projection for the new state.
    Project {
        /// Pairing code to expose; `None` clears any previous code.
        pairing_code: Option<String>,
        /// Whether this transition stamps `last_connected_at`.
        touch_last_connected: bool,
    },
    /// Persist rotated credentials without changing state.
    PersistCredentials(Box<CredentialSet>),
    /// Delete stored credentials, forcing re-pairing on the next connect.
    WipeCredentials,
    /// Re-enter `connecting` after the configured reconnect delay.
    ScheduleReconnect,
    /// Tear down the live transport link.
    CloseLink,
}

/// Compute the transition for `event` in `state`.
///
/// Events that make no sense in the current state (a stale `Closed` after
/// the session already ended, a connect request while already live) return
/// the state unchanged with no effects.
pub fn handle_event(
    state: ConnectionState,
    event: &SessionEvent,
) -> (ConnectionState, Vec<Effect>) {
    use ConnectionState::*;

    match (state, event) {
        // A connect request only acts from the two resting states; anywhere
        // else a session is already in flight and must be reused.
        (Disconnected | Error, SessionEvent::ConnectRequested) => (
            Connecting,
            vec![
                Effect::Project {
                    pairing_code: None,
                    touch_last_connected: false,
                },
                Effect::OpenTransport,
            ],
        ),
        (Connecting | AwaitingPairing | Connected, SessionEvent::ConnectRequested) => {
            (state, vec![])
        }

        // Fresh identity: the transport challenges for pairing. Re-emission
        // while already waiting refreshes the projected code.
        (Connecting | AwaitingPairing, SessionEvent::PairingCode(code)) => (
            AwaitingPairing,
            vec![Effect::Project {
                pairing_code: Some(code.clone()),
                touch_last_connected: false,
            }],
        ),
        (_, SessionEvent::PairingCode(_)) => (state, vec![]),

        // Live confirmation clears any pairing code and stamps the
        // connection timestamp.
        (_, SessionEvent::Opened) => (
            Connected,
            vec![Effect::Project {
                pairing_code: None,
                touch_last_connected: true,
            }],
        ),

        // Closure while a session is in flight. Terminal logout invalidates
        // the stored credentials; anything transient schedules a reconnect.
        (Connecting | AwaitingPairing | Connected, SessionEvent::Closed(reason)) => {
            if reason.is_terminal() {
                (
                    Disconnected,
                    vec![
                        Effect::WipeCredentials,
                        Effect::Project {
                            pairing_code: None,
                            touch_last_connected: false,
                        },
                    ],
                )
            } else {
                (
                    Error,
                    vec![
                        Effect::Project {
                            pairing_code: None,
                            touch_last_connected: false,
                        },
                        Effect::ScheduleReconnect,
                    ],
                )
            }
        }
        (Disconnected | Error, SessionEvent::Closed(_)) => (state, vec![]),

        // Credential rotation persists in any state without a transition.
        (_, SessionEvent::CredentialsChanged(creds)) => (
            state,
            vec![Effect::PersistCredentials(creds.clone())],
        ),

        // Explicit disconnect tears down whatever is in flight.
        (_, SessionEvent::DisconnectRequested { wipe_credentials }) => {
            let mut effects = vec![
                Effect::CloseLink,
                Effect::Project {
                    pairing_code: None,
                    touch_last_connected: false,
                },
            ];
            if *wipe_credentials {
                effects.push(Effect::WipeCredentials);
            }
            (Disconnected, effects)
        }
    }
}
