//! Testing utilities and mock implementations
//!
//! This module provides a mock telemetry client for exercising the producer
//! and the connection coordinator without an MQTT broker.

pub mod mocks;

pub use mocks::*;
