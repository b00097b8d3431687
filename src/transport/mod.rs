//! Transport layer for telemetry publishing
//!
//! This module provides the client abstraction the producer drives and its
//! MQTT implementation.

use std::fmt;
use std::sync::Arc;

pub mod mqtt;

use mqtt::ConnectionCoordinator;

/// Client-assigned identifier of a published message
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Publishing client driven by the producer
///
/// Implementations deliver connect, disconnect and publish results to the
/// coordinator passed to [`TelemetryClient::connect`], from whatever task or
/// thread they own. This enables dependency injection and testing.
#[async_trait::async_trait]
pub trait TelemetryClient: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Start connecting; the outcome arrives later through the coordinator
    async fn connect(&mut self, coordinator: Arc<ConnectionCoordinator>)
        -> Result<(), Self::Error>;

    /// Enqueue a message; the acknowledgement arrives later through the coordinator
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<MessageId, Self::Error>;

    /// Request a clean disconnect
    async fn disconnect(&mut self) -> Result<(), Self::Error>;
}
