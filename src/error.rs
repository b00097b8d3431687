//! Error types for the telemetry producer
//!
//! Callbacks never return errors; everything here is raised on the control
//! flow, either at a wait point or inside the publish loop.

use crate::transport::mqtt::ConnectError;
use std::time::Duration;
use thiserror::Error;

/// Main error type for producer operations
#[derive(Debug, Error)]
pub enum ProducerError {
    #[error("Connection failed: {0}")]
    Connect(#[from] ConnectError),

    #[error("Timed out after {timeout:?} waiting for the broker to accept the connection")]
    ConnectTimeout { timeout: Duration },

    #[error("Client error: {0}")]
    ClientError(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Failed to encode telemetry payload: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ProducerError {
    /// Wrap an error raised by the underlying client
    pub fn client<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ClientError(Box::new(error))
    }

    pub fn connect_timeout(timeout: Duration) -> Self {
        Self::ConnectTimeout { timeout }
    }
}

/// Result type for producer operations
pub type ProducerResult<T> = Result<T, ProducerError>;
