//! Mock implementations for testing
//!
//! [`MockTelemetryClient`] delivers its callbacks from a separate OS thread,
//! the way a client library's network thread would.

use crate::transport::mqtt::{ConnectionCoordinator, DisconnectReason};
use crate::transport::{MessageId, TelemetryClient};
use async_trait::async_trait;
use rumqttc::ConnectReturnCode;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;

pub type PublishedMessage = (String, Vec<u8>);

/// Scripted outcome of [`TelemetryClient::connect`]
#[derive(Debug, Clone, PartialEq)]
pub enum MockConnect {
    /// Report success after `delay`
    Accept { delay: Duration },
    /// Report a refusal code after `delay`
    Refuse {
        code: ConnectReturnCode,
        delay: Duration,
    },
    /// Report a transport failure after `delay`
    TransportFailure { reason: String, delay: Duration },
    /// Never report anything
    Silent,
}

#[derive(Debug, Error, PartialEq)]
pub enum MockClientError {
    #[error("Mock connect failure")]
    ConnectFailed,
    #[error("Mock publish failure")]
    PublishFailed,
    #[error("Mock disconnect failure")]
    DisconnectFailed,
}

/// Mock telemetry client for testing
#[derive(Debug)]
pub struct MockTelemetryClient {
    pub connect_behavior: MockConnect,
    /// `connect` itself returns an error
    pub fail_connect: bool,
    /// Publishing fails once this many messages were accepted
    pub fail_publish_after: Option<usize>,
    pub fail_disconnect: bool,
    /// `publish` never completes, like a full request queue
    pub stall_publish: bool,
    /// Report a disconnect result when `disconnect` is called
    pub acknowledge_disconnect: bool,
    pub published_messages: Arc<Mutex<Vec<PublishedMessage>>>,
    coordinator: Option<Arc<ConnectionCoordinator>>,
    next_message_id: AtomicU64,
    connect_calls: AtomicUsize,
    disconnect_calls: AtomicUsize,
}

impl Default for MockTelemetryClient {
    fn default() -> Self {
        Self {
            connect_behavior: MockConnect::Accept {
                delay: Duration::ZERO,
            },
            fail_connect: false,
            fail_publish_after: None,
            fail_disconnect: false,
            stall_publish: false,
            acknowledge_disconnect: true,
            published_messages: Arc::new(Mutex::new(Vec::new())),
            coordinator: None,
            next_message_id: AtomicU64::new(0),
            connect_calls: AtomicUsize::new(0),
            disconnect_calls: AtomicUsize::new(0),
        }
    }
}

impl MockTelemetryClient {
    /// Client that accepts the connection immediately
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connect(behavior: MockConnect) -> Self {
        Self {
            connect_behavior: behavior,
            ..Default::default()
        }
    }

    pub fn with_publish_failure_after(accepted: usize) -> Self {
        Self {
            fail_publish_after: Some(accepted),
            ..Default::default()
        }
    }

    pub async fn get_published_messages(&self) -> Vec<PublishedMessage> {
        self.published_messages.lock().await.clone()
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn disconnect_calls(&self) -> usize {
        self.disconnect_calls.load(Ordering::SeqCst)
    }

    /// Run `callback` on a fresh thread after `delay`
    fn deliver_later<F>(delay: Duration, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        std::thread::spawn(move || {
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
            callback();
        });
    }
}

#[async_trait]
impl TelemetryClient for MockTelemetryClient {
    type Error = MockClientError;

    async fn connect(
        &mut self,
        coordinator: Arc<ConnectionCoordinator>,
    ) -> Result<(), Self::Error> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect {
            return Err(MockClientError::ConnectFailed);
        }
        self.coordinator = Some(coordinator.clone());

        match self.connect_behavior.clone() {
            MockConnect::Accept { delay } => Self::deliver_later(delay, move || {
                coordinator.on_connect_result(ConnectReturnCode::Success)
            }),
            MockConnect::Refuse { code, delay } => {
                Self::deliver_later(delay, move || coordinator.on_connect_result(code))
            }
            MockConnect::TransportFailure { reason, delay } => {
                Self::deliver_later(delay, move || coordinator.on_transport_error(&reason))
            }
            MockConnect::Silent => {}
        }
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<MessageId, Self::Error> {
        if self.stall_publish {
            std::future::pending::<()>().await;
        }
        let mut published = self.published_messages.lock().await;
        if let Some(limit) = self.fail_publish_after {
            if published.len() >= limit {
                return Err(MockClientError::PublishFailed);
            }
        }
        published.push((topic.to_string(), payload));

        let id = MessageId(self.next_message_id.fetch_add(1, Ordering::SeqCst) + 1);
        if let Some(coordinator) = &self.coordinator {
            coordinator.on_publish_ack(id);
        }
        Ok(id)
    }

    async fn disconnect(&mut self) -> Result<(), Self::Error> {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_disconnect {
            return Err(MockClientError::DisconnectFailed);
        }
        if self.acknowledge_disconnect {
            if let Some(coordinator) = self.coordinator.clone() {
                Self::deliver_later(Duration::ZERO, move || {
                    coordinator.on_disconnect_result(&DisconnectReason::Requested)
                });
            }
        }
        Ok(())
    }
}
