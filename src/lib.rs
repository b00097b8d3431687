//! Vehicle Telemetry Producer
//!
//! Publishes synthetic vehicle telemetry to an MQTT broker on a fixed interval.
//!
//! # Overview
//!
//! - [`transport::mqtt::ConnectionCoordinator`] bridges the MQTT event-delivery
//!   task and the control flow with race-free connect/disconnect waits
//! - [`transport::mqtt::MqttTelemetryClient`] drives `rumqttc`
//! - [`producer::TelemetryProducer`] runs connect, publish loop and shutdown
//! - [`telemetry`] generates the vehicle samples
//! - [`config::ConnectionSettings`] loads `MQTT_*` settings
//!
//! # Quick Start
//!
//! ```rust
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use telemetry_producer::telemetry::{generate_vehicle_data, TelemetryEnvelope};
//! use telemetry_producer::transport::mqtt::TopicBuilder;
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! let envelope = TelemetryEnvelope::new(generate_vehicle_data(&mut rng));
//!
//! let topic = TopicBuilder::build_position_topic("vehicle-sim-1");
//! let payload = envelope.to_payload().unwrap();
//!
//! assert_eq!(topic, "vehicles/vehicle-sim-1/position");
//! assert!(payload.starts_with(r#"{"data":"#));
//! ```

pub mod config;
pub mod error;
pub mod observability;
pub mod producer;
pub mod telemetry;
pub mod testing;
pub mod transport;

pub use config::{ConnectionSettings, SettingsError};
pub use error::{ProducerError, ProducerResult};
pub use producer::{ProducerOptions, RunOutcome, TelemetryProducer};
pub use telemetry::{TelemetryEnvelope, VehicleTelemetrySample};
pub use transport::mqtt::{ConnectError, ConnectionCoordinator, MqttTelemetryClient};
pub use transport::{MessageId, TelemetryClient};
