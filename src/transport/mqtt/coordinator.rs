//! Connection lifecycle coordination between the MQTT delivery task and the
//! main control flow
//!
//! The MQTT event loop reports connect, disconnect and publish results on its
//! own task. [`ConnectionCoordinator`] turns those callbacks into guarded state
//! that the control flow can block on with [`ConnectionCoordinator::wait_for_connected`]
//! and [`ConnectionCoordinator::wait_for_disconnected`].
//!
//! The state lives behind a `tokio::sync::watch` channel: every callback
//! mutates the value under the channel's lock and wakes all receivers, and
//! every wait checks the current value before sleeping, so a result that
//! arrived before the wait started is never lost.

use super::connection::connack_reason;
use crate::transport::MessageId;
use rumqttc::ConnectReturnCode;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Connection failure captured by a callback and surfaced on the waiting side
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConnectError {
    #[error("Connection refused by broker: {}", connack_reason(.code))]
    Refused { code: ConnectReturnCode },
    #[error("Transport failed before the session was established: {0}")]
    Transport(String),
}

/// Guarded connection state shared by callbacks and waiters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionState {
    pub connected: bool,
    pub error: Option<ConnectError>,
}

impl ConnectionState {
    /// A connect attempt has produced a result (success or captured failure)
    fn is_settled(&self) -> bool {
        self.connected || self.error.is_some()
    }
}

/// Why a session ended
#[derive(Debug, Clone, PartialEq)]
pub enum DisconnectReason {
    /// The local client sent DISCONNECT
    Requested,
    /// The broker sent DISCONNECT
    ByBroker,
    /// The network connection was lost
    Network(String),
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::Requested => write!(f, "client requested disconnect"),
            DisconnectReason::ByBroker => write!(f, "broker closed the session"),
            DisconnectReason::Network(reason) => write!(f, "network error: {reason}"),
        }
    }
}

/// Race-free bridge between MQTT callbacks and the control flow.
///
/// One coordinator is created per client session and handed to the client
/// when it connects. Only the callback methods mutate the state.
#[derive(Debug)]
pub struct ConnectionCoordinator {
    state: watch::Sender<ConnectionState>,
    // Observability only; 0 means nothing acknowledged yet
    last_acked: AtomicU64,
}

impl Default for ConnectionCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionCoordinator {
    pub fn new() -> Self {
        let (state, _) = watch::channel(ConnectionState::default());
        Self {
            state,
            last_acked: AtomicU64::new(0),
        }
    }

    /// Handle the broker's CONNACK result.
    pub fn on_connect_result(&self, code: ConnectReturnCode) {
        self.state.send_modify(|state| {
            if code == ConnectReturnCode::Success {
                state.connected = true;
                state.error = None;
            } else {
                state.connected = false;
                state.error = Some(ConnectError::Refused { code });
            }
        });

        if code == ConnectReturnCode::Success {
            info!("Connected to MQTT broker");
        } else {
            warn!("MQTT broker refused connection: {}", connack_reason(&code));
        }
    }

    /// Handle the end of a session, requested or not.
    pub fn on_disconnect_result(&self, reason: &DisconnectReason) {
        self.state.send_modify(|state| state.connected = false);
        info!("Received disconnect: {}", reason);
    }

    /// Record that a published message left the client.
    pub fn on_publish_ack(&self, message_id: MessageId) {
        self.last_acked.fetch_max(message_id.0, Ordering::SeqCst);
        info!("Sent publish with message id {}", message_id);
    }

    /// Handle a transport failure that carries no CONNACK code.
    ///
    /// Before the session is up this is a connect failure; afterwards it ends
    /// the session.
    pub fn on_transport_error(&self, reason: &str) {
        let mut was_connected = false;
        self.state.send_modify(|state| {
            was_connected = state.connected;
            if !state.connected {
                state.error = Some(ConnectError::Transport(reason.to_string()));
            }
            state.connected = false;
        });

        if was_connected {
            info!(
                "Received disconnect: {}",
                DisconnectReason::Network(reason.to_string())
            );
        } else {
            warn!("MQTT transport failed while connecting: {}", reason);
        }
    }

    /// Wait until the session is connected, a connect failure was captured,
    /// or `timeout` elapses.
    ///
    /// Returns `Ok(false)` on timeout and the captured error if the connect
    /// attempt failed.
    pub async fn wait_for_connected(&self, timeout: Duration) -> Result<bool, ConnectError> {
        let mut rx = self.state.subscribe();
        let settled = tokio::time::timeout(timeout, rx.wait_for(ConnectionState::is_settled))
            .await
            .is_ok();
        if !settled {
            debug!("Timed out after {:?} waiting for connection", timeout);
        }

        let state = self.state.borrow();
        match &state.error {
            Some(error) => Err(error.clone()),
            None => Ok(state.connected),
        }
    }

    /// Wait until the session is disconnected or `timeout` elapses.
    ///
    /// Returns whether disconnection was observed. Never fails.
    pub async fn wait_for_disconnected(&self, timeout: Duration) -> bool {
        let mut rx = self.state.subscribe();
        let observed = tokio::time::timeout(timeout, rx.wait_for(|state| !state.connected))
            .await
            .is_ok();
        observed
    }

    pub fn is_connected(&self) -> bool {
        self.state.borrow().connected
    }

    /// Highest message id acknowledged so far
    pub fn last_acked(&self) -> Option<MessageId> {
        match self.last_acked.load(Ordering::SeqCst) {
            0 => None,
            id => Some(MessageId(id)),
        }
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> ConnectionState {
        self.state.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn test_initial_state_is_disconnected() {
        let coordinator = ConnectionCoordinator::new();
        assert_eq!(coordinator.snapshot(), ConnectionState::default());
        assert!(!coordinator.is_connected());
    }

    #[tokio::test]
    async fn test_success_before_wait_is_not_missed() {
        let coordinator = ConnectionCoordinator::new();
        coordinator.on_connect_result(ConnectReturnCode::Success);

        let start = Instant::now();
        let connected = coordinator
            .wait_for_connected(Duration::from_secs(5))
            .await
            .unwrap();

        assert!(connected);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_refused_connect_surfaces_captured_error() {
        let coordinator = ConnectionCoordinator::new();
        coordinator.on_connect_result(ConnectReturnCode::NotAuthorized);

        let result = coordinator.wait_for_connected(Duration::from_secs(5)).await;

        assert_eq!(
            result,
            Err(ConnectError::Refused {
                code: ConnectReturnCode::NotAuthorized
            })
        );
        assert!(!coordinator.is_connected());
    }

    #[tokio::test]
    async fn test_refusal_from_another_thread_wakes_waiter() {
        let coordinator = Arc::new(ConnectionCoordinator::new());
        let callback_side = coordinator.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            callback_side.on_connect_result(ConnectReturnCode::BadUserNamePassword);
        });

        let start = Instant::now();
        let result = coordinator.wait_for_connected(Duration::from_secs(5)).await;

        assert!(matches!(result, Err(ConnectError::Refused { .. })));
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_wait_for_connected_times_out() {
        let coordinator = ConnectionCoordinator::new();

        let start = Instant::now();
        let connected = coordinator
            .wait_for_connected(Duration::from_millis(10))
            .await
            .unwrap();

        assert!(!connected);
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_repeated_disconnects_leave_state_disconnected() {
        let coordinator = ConnectionCoordinator::new();
        coordinator.on_connect_result(ConnectReturnCode::Success);

        coordinator.on_disconnect_result(&DisconnectReason::Requested);
        coordinator.on_disconnect_result(&DisconnectReason::ByBroker);
        coordinator.on_disconnect_result(&DisconnectReason::Requested);

        assert!(!coordinator.is_connected());
        let start = Instant::now();
        assert!(
            coordinator
                .wait_for_disconnected(Duration::from_secs(5))
                .await
        );
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_wait_for_disconnected_times_out_while_connected() {
        let coordinator = ConnectionCoordinator::new();
        coordinator.on_connect_result(ConnectReturnCode::Success);

        let observed = coordinator
            .wait_for_disconnected(Duration::from_millis(10))
            .await;

        assert!(!observed);
        assert!(coordinator.is_connected());
    }

    #[tokio::test]
    async fn test_success_clears_previous_error() {
        let coordinator = ConnectionCoordinator::new();
        coordinator.on_connect_result(ConnectReturnCode::ServiceUnavailable);
        coordinator.on_connect_result(ConnectReturnCode::Success);

        let state = coordinator.snapshot();
        assert!(state.connected);
        assert!(state.error.is_none());
        assert!(coordinator
            .wait_for_connected(Duration::from_millis(10))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_transport_error_before_connect_is_captured() {
        let coordinator = ConnectionCoordinator::new();
        coordinator.on_transport_error("connection refused (os error 111)");

        let result = coordinator.wait_for_connected(Duration::from_secs(1)).await;

        assert_eq!(
            result,
            Err(ConnectError::Transport(
                "connection refused (os error 111)".to_string()
            ))
        );
    }

    #[test]
    fn test_transport_error_after_connect_is_a_disconnect() {
        let coordinator = ConnectionCoordinator::new();
        coordinator.on_connect_result(ConnectReturnCode::Success);

        coordinator.on_transport_error("connection reset by peer");

        assert_eq!(coordinator.snapshot(), ConnectionState::default());
    }

    #[test]
    fn test_publish_ack_does_not_change_state() {
        let coordinator = ConnectionCoordinator::new();
        coordinator.on_connect_result(ConnectReturnCode::Success);
        let before = coordinator.snapshot();

        coordinator.on_publish_ack(MessageId(7));

        assert_eq!(coordinator.snapshot(), before);
        assert_eq!(coordinator.last_acked(), Some(MessageId(7)));
    }

    #[test]
    fn test_last_acked_keeps_highest_id() {
        let coordinator = ConnectionCoordinator::new();
        assert_eq!(coordinator.last_acked(), None);

        coordinator.on_publish_ack(MessageId(2));
        coordinator.on_publish_ack(MessageId(1));

        assert_eq!(coordinator.last_acked(), Some(MessageId(2)));
    }

    #[test]
    fn test_connect_error_display() {
        let refused = ConnectError::Refused {
            code: ConnectReturnCode::BadClientId,
        };
        assert!(refused.to_string().contains("identifier rejected"));

        let transport = ConnectError::Transport("tls handshake failed".to_string());
        assert!(transport.to_string().contains("tls handshake failed"));
    }

    #[test]
    fn test_disconnect_reason_display() {
        assert_eq!(
            DisconnectReason::Requested.to_string(),
            "client requested disconnect"
        );
        assert_eq!(
            DisconnectReason::Network("eof".to_string()).to_string(),
            "network error: eof"
        );
    }
}
