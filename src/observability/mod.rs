//! Observability for the telemetry producer
//!
//! Structured logging through `tracing`, configured from the environment.

pub mod logging;

// Re-export for convenience
pub use logging::{init_logging, init_logging_with_verbosity, parse_level, LogFormat};

// Span macros for structured logging
pub use logging::mqtt_span;
