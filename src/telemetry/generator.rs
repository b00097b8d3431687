//! Random vehicle telemetry generation
//!
//! Pure with respect to the supplied RNG: seeding the RNG makes output
//! reproducible (apart from the timestamp, which is relative to now).

use super::{
    Diagnostics, EngineStatus, Location, Telemetry, TirePressure, VehicleTelemetrySample,
};
use chrono::{Duration, Utc};
use rand::Rng;

/// Brands and the models sampled for each
pub const BRANDS_MODELS: [(&str, [&str; 3]); 14] = [
    ("BMW", ["3 Series", "5 Series", "X5"]),
    ("Mercedes", ["C-Class", "E-Class", "GLA"]),
    ("Peugeot", ["208", "3008", "5008"]),
    ("Renault", ["Clio", "Megane", "Captur"]),
    ("Fiat", ["500", "Panda", "Tipo"]),
    ("Toyota", ["Camry", "Corolla", "RAV4"]),
    ("Honda", ["Civic", "Accord", "CR-V"]),
    ("Mazda", ["CX-5", "Mazda3", "MX-5"]),
    ("Kia", ["Sorento", "Sportage", "Rio"]),
    ("BYD", ["Han", "Atto 3", "Tang"]),
    ("Seat", ["Ibiza", "Leon", "Arona"]),
    ("Dacia", ["Duster", "Sandero", "Jogger"]),
    ("Ford", ["F-150", "Focus", "Explorer"]),
    ("Tesla", ["Model S", "Model 3", "Model X"]),
];

const VIN_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const VIN_LENGTH: usize = 17;
const MAX_SAMPLE_AGE_MINUTES: i64 = 120;

pub fn is_electric_brand(brand: &str) -> bool {
    matches!(brand, "Tesla" | "BYD")
}

/// Generate one random vehicle sample
pub fn generate_vehicle_data<R: Rng + ?Sized>(rng: &mut R) -> VehicleTelemetrySample {
    let (brand, models) = BRANDS_MODELS[rng.gen_range(0..BRANDS_MODELS.len())];
    let model = models[rng.gen_range(0..models.len())];
    let is_electric = is_electric_brand(brand);

    let vin = (0..VIN_LENGTH)
        .map(|_| VIN_ALPHABET[rng.gen_range(0..VIN_ALPHABET.len())] as char)
        .collect();

    let timestamp = Utc::now() - Duration::minutes(rng.gen_range(0..=MAX_SAMPLE_AGE_MINUTES));

    let telemetry = Telemetry {
        timestamp,
        location: random_location(rng),
        speed: rng.gen_range(0..=120),
        engine_status: (!is_electric).then_some(EngineStatus::Running),
        fuel_level: (!is_electric).then(|| round_to(rng.gen_range(0.0..=100.0), 1)),
        battery_level: is_electric.then(|| round_to(rng.gen_range(0.0..=100.0), 1)),
        odometer: round_to(rng.gen_range(0.0..=200_000.0), 1),
        diagnostics: random_diagnostics(rng, is_electric),
    };

    VehicleTelemetrySample {
        brand: brand.to_string(),
        model: model.to_string(),
        year_of_manufacture: rng.gen_range(2000..=2024),
        vin,
        telemetry,
    }
}

fn random_location<R: Rng + ?Sized>(rng: &mut R) -> Location {
    Location {
        latitude: round_to(rng.gen_range(-90.0..=90.0), 6),
        longitude: round_to(rng.gen_range(-180.0..=180.0), 6),
    }
}

fn random_tire_pressure<R: Rng + ?Sized>(rng: &mut R) -> TirePressure {
    TirePressure {
        front_left: rng.gen_range(30..=36),
        front_right: rng.gen_range(30..=36),
        rear_left: rng.gen_range(30..=36),
        rear_right: rng.gen_range(30..=36),
    }
}

fn random_diagnostics<R: Rng + ?Sized>(rng: &mut R, is_electric: bool) -> Diagnostics {
    let engine_temp = rng.gen_range(70..=120);
    let battery_voltage = round_to(rng.gen_range(12.0..=14.0), 1);
    let tire_pressure = random_tire_pressure(rng);

    if is_electric {
        Diagnostics {
            engine_temp: None,
            battery_voltage,
            tire_pressure,
            battery_temp: Some(rng.gen_range(20..=40)),
            motor_temp: Some(rng.gen_range(50..=80)),
        }
    } else {
        Diagnostics {
            engine_temp: Some(engine_temp),
            battery_voltage,
            tire_pressure,
            battery_temp: None,
            motor_temp: None,
        }
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
