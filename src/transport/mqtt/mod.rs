//! MQTT client implementation for the telemetry producer
//!
//! This module separates pure configuration and event routing from the I/O
//! that drives the `rumqttc` event loop.
//!
//! # Architecture
//!
//! - [`connection`] - Pure option building, topic construction and CONNACK naming
//! - [`coordinator`] - Guarded connection state shared with the control flow
//! - [`message_handler`] - Pure routing of event-loop results
//! - [`client`] - Impure I/O operations and the event-delivery task
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use telemetry_producer::config::ConnectionSettings;
//! use telemetry_producer::transport::TelemetryClient;
//! use telemetry_producer::transport::mqtt::{ConnectionCoordinator, MqttTelemetryClient};
//!
//! # tokio_test::block_on(async {
//! let settings = ConnectionSettings::load(None)?;
//! let mut client = MqttTelemetryClient::new(&settings)?;
//! let coordinator = Arc::new(ConnectionCoordinator::new());
//!
//! client.connect(coordinator.clone()).await?;
//! if coordinator.wait_for_connected(Duration::from_secs(10)).await? {
//!     client.publish("vehicles/sim/position", b"{}".to_vec()).await?;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # });
//! ```

pub mod client;
pub mod connection;
pub mod coordinator;
pub mod message_handler;

// Re-export public types for convenience
pub use client::MqttTelemetryClient;
pub use connection::{configure_mqtt_options, connack_reason, MqttError, TopicBuilder};
pub use coordinator::{ConnectError, ConnectionCoordinator, ConnectionState, DisconnectReason};
pub use message_handler::{EventRoute, MessageHandler};
