//! Vehicle telemetry payloads
//!
//! Samples are value objects generated fresh for every publish and wrapped
//! in a [`TelemetryEnvelope`] before JSON serialization.

pub mod generator;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use generator::{generate_vehicle_data, is_electric_brand, BRANDS_MODELS};

/// One synthetic vehicle reading
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VehicleTelemetrySample {
    pub brand: String,
    pub model: String,
    pub year_of_manufacture: u16,
    pub vin: String,
    pub telemetry: Telemetry,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Telemetry {
    pub timestamp: DateTime<Utc>,
    pub location: Location,
    /// km/h
    pub speed: u32,
    /// `None` for electric vehicles
    pub engine_status: Option<EngineStatus>,
    /// Percent, combustion vehicles only
    pub fuel_level: Option<f64>,
    /// Percent, electric vehicles only
    pub battery_level: Option<f64>,
    /// km
    pub odometer: f64,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EngineStatus {
    Running,
}

/// Diagnostics block; combustion and electric vehicles report different temperatures
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Diagnostics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_temp: Option<u32>,
    pub battery_voltage: f64,
    pub tire_pressure: TirePressure,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery_temp: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motor_temp: Option<u32>,
}

/// Tire pressure in psi
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TirePressure {
    pub front_left: u32,
    pub front_right: u32,
    pub rear_left: u32,
    pub rear_right: u32,
}

/// Published payload: `{"data": <sample>}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TelemetryEnvelope {
    pub data: VehicleTelemetrySample,
}

impl TelemetryEnvelope {
    pub fn new(data: VehicleTelemetrySample) -> Self {
        Self { data }
    }

    /// Serialize to the JSON text sent on the wire
    pub fn to_payload(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
