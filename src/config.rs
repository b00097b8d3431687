//! Connection settings for the telemetry producer
//!
//! Settings are read from `MQTT_*` variables. An optional env file supplies
//! values for variables that are not already set in the process environment.

use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_TCP_PORT: u16 = 1883;
pub const DEFAULT_TLS_PORT: u16 = 8883;
pub const DEFAULT_KEEP_ALIVE_SECS: u64 = 60;

/// Smallest non-zero keepalive the client library accepts without complaint
const MIN_KEEP_ALIVE_SECS: u64 = 5;

/// Broker connection settings
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConnectionSettings {
    /// Client identifier, also used in the publish topic
    pub client_id: String,
    pub host_name: String,
    pub tcp_port: u16,
    pub keep_alive_secs: u64,
    /// Only clean sessions are supported
    pub clean_session: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    pub use_tls: bool,
    /// Client certificate (PEM)
    pub cert_file: Option<PathBuf>,
    /// Client private key (PEM)
    pub key_file: Option<PathBuf>,
    pub key_file_password: Option<String>,
    /// CA bundle; platform roots are used when absent
    pub ca_file: Option<PathBuf>,
}

/// Settings loading errors
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read env file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },
    #[error("Required setting not found: {0}")]
    Missing(&'static str),
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("Invalid client ID {0:?}: must be non-empty and must not contain '/', '+' or '#'")]
    InvalidClientId(String),
    #[error("Persistent sessions are not supported; set MQTT_CLEAN_SESSION=true")]
    PersistentSession,
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ConnectionSettings {
    /// Load settings from the process environment, falling back to the
    /// optional env file for unset variables.
    pub fn load(env_file: Option<&Path>) -> Result<Self, SettingsError> {
        let file_vars = match env_file {
            Some(path) => read_env_file(path)?,
            None => HashMap::new(),
        };

        Self::from_lookup(|key| std::env::var(key).ok().or_else(|| file_vars.get(key).cloned()))
    }

    /// Load settings from an env file only, ignoring the process environment
    pub fn from_env_file(path: &Path) -> Result<Self, SettingsError> {
        let vars = read_env_file(path)?;
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    /// Build and validate settings from a key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let client_id = get("MQTT_CLIENT_ID").ok_or(SettingsError::Missing("MQTT_CLIENT_ID"))?;
        validate_client_id(&client_id)?;

        let host_name = get("MQTT_HOST_NAME").ok_or(SettingsError::Missing("MQTT_HOST_NAME"))?;

        let use_tls = get("MQTT_USE_TLS")
            .map(|value| parse_bool("MQTT_USE_TLS", &value))
            .transpose()?
            .unwrap_or(false);

        let tcp_port = match get("MQTT_TCP_PORT") {
            Some(value) => parse_port(&value)?,
            None if use_tls => DEFAULT_TLS_PORT,
            None => DEFAULT_TCP_PORT,
        };

        let keep_alive_secs = match get("MQTT_KEEP_ALIVE_IN_SECONDS") {
            Some(value) => parse_keep_alive(&value)?,
            None => DEFAULT_KEEP_ALIVE_SECS,
        };

        let clean_session = get("MQTT_CLEAN_SESSION")
            .map(|value| parse_bool("MQTT_CLEAN_SESSION", &value))
            .transpose()?
            .unwrap_or(true);

        let settings = ConnectionSettings {
            client_id,
            host_name,
            tcp_port,
            keep_alive_secs,
            clean_session,
            username: get("MQTT_USERNAME"),
            password: get("MQTT_PASSWORD"),
            use_tls,
            cert_file: get("MQTT_CERT_FILE").map(PathBuf::from),
            key_file: get("MQTT_KEY_FILE").map(PathBuf::from),
            key_file_password: get("MQTT_KEY_FILE_PASSWORD"),
            ca_file: get("MQTT_CA_FILE").map(PathBuf::from),
        };
        settings.validate()?;

        Ok(settings)
    }

    /// Check combinations the producer cannot honour
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !self.clean_session {
            return Err(SettingsError::PersistentSession);
        }
        if self.use_tls {
            if self.cert_file.is_some() && self.key_file.is_none() {
                return Err(SettingsError::InvalidConfig(
                    "MQTT_CERT_FILE requires MQTT_KEY_FILE".to_string(),
                ));
            }
            if self.key_file_password.is_some() {
                return Err(SettingsError::InvalidConfig(
                    "encrypted private keys (MQTT_KEY_FILE_PASSWORD) are not supported".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Copy with secrets masked, for display
    pub fn redacted(&self) -> Self {
        let mask = |value: &Option<String>| value.as_ref().map(|_| "***".to_string());
        Self {
            password: mask(&self.password),
            key_file_password: mask(&self.key_file_password),
            ..self.clone()
        }
    }

    /// Create a test configuration for unit testing
    #[cfg(test)]
    pub fn test_settings() -> Self {
        Self::from_lookup(|key| match key {
            "MQTT_CLIENT_ID" => Some("vehicle-sim-1".to_string()),
            "MQTT_HOST_NAME" => Some("localhost".to_string()),
            _ => None,
        })
        .expect("Test settings should be valid")
    }
}

fn read_env_file(path: &Path) -> Result<HashMap<String, String>, SettingsError> {
    let to_error = |source| SettingsError::EnvFile {
        path: path.to_path_buf(),
        source,
    };
    dotenvy::from_path_iter(path)
        .map_err(to_error)?
        .collect::<Result<HashMap<_, _>, _>>()
        .map_err(to_error)
}

/// Client IDs become topic levels, so separators and wildcards are rejected
fn validate_client_id(client_id: &str) -> Result<(), SettingsError> {
    if client_id.is_empty() || client_id.contains(['/', '+', '#']) {
        return Err(SettingsError::InvalidClientId(client_id.to_string()));
    }
    Ok(())
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, SettingsError> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(SettingsError::InvalidValue {
            key,
            value: value.to_string(),
            reason: "expected true/false, 1/0 or yes/no".to_string(),
        }),
    }
}

fn parse_port(value: &str) -> Result<u16, SettingsError> {
    match value.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        Ok(_) => Err(SettingsError::InvalidValue {
            key: "MQTT_TCP_PORT",
            value: value.to_string(),
            reason: "port must be non-zero".to_string(),
        }),
        Err(e) => Err(SettingsError::InvalidValue {
            key: "MQTT_TCP_PORT",
            value: value.to_string(),
            reason: e.to_string(),
        }),
    }
}

fn parse_keep_alive(value: &str) -> Result<u64, SettingsError> {
    let invalid = |reason: String| SettingsError::InvalidValue {
        key: "MQTT_KEEP_ALIVE_IN_SECONDS",
        value: value.to_string(),
        reason,
    };
    let secs = value.parse::<u64>().map_err(|e| invalid(e.to_string()))?;
    if secs > u64::from(u16::MAX) {
        return Err(invalid(format!("must be at most {}", u16::MAX)));
    }
    if secs != 0 && secs < MIN_KEEP_ALIVE_SECS {
        return Err(invalid(format!(
            "must be 0 or at least {MIN_KEEP_ALIVE_SECS}"
        )));
    }
    Ok(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("MQTT_CLIENT_ID", "vehicle-sim-1"),
        ("MQTT_HOST_NAME", "broker.local"),
    ];

    #[test]
    fn test_minimal_settings_apply_defaults() {
        let settings = ConnectionSettings::from_lookup(lookup_from(&REQUIRED)).unwrap();

        assert_eq!(settings.client_id, "vehicle-sim-1");
        assert_eq!(settings.host_name, "broker.local");
        assert_eq!(settings.tcp_port, DEFAULT_TCP_PORT);
        assert_eq!(settings.keep_alive_secs, DEFAULT_KEEP_ALIVE_SECS);
        assert!(settings.clean_session);
        assert!(!settings.use_tls);
        assert_eq!(settings.username, None);
    }

    #[test]
    fn test_tls_changes_default_port() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("MQTT_USE_TLS", "true"));

        let settings = ConnectionSettings::from_lookup(lookup_from(&pairs)).unwrap();

        assert!(settings.use_tls);
        assert_eq!(settings.tcp_port, DEFAULT_TLS_PORT);
    }

    #[test]
    fn test_explicit_port_wins_over_tls_default() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("MQTT_USE_TLS", "yes"));
        pairs.push(("MQTT_TCP_PORT", "18883"));

        let settings = ConnectionSettings::from_lookup(lookup_from(&pairs)).unwrap();

        assert_eq!(settings.tcp_port, 18883);
    }

    #[test]
    fn test_missing_required_keys() {
        let result = ConnectionSettings::from_lookup(lookup_from(&[("MQTT_HOST_NAME", "h")]));
        assert!(matches!(result, Err(SettingsError::Missing("MQTT_CLIENT_ID"))));

        let result = ConnectionSettings::from_lookup(lookup_from(&[("MQTT_CLIENT_ID", "c")]));
        assert!(matches!(result, Err(SettingsError::Missing("MQTT_HOST_NAME"))));
    }

    #[test]
    fn test_blank_value_counts_as_missing() {
        let pairs = [("MQTT_CLIENT_ID", "   "), ("MQTT_HOST_NAME", "h")];
        let result = ConnectionSettings::from_lookup(lookup_from(&pairs));
        assert!(matches!(result, Err(SettingsError::Missing("MQTT_CLIENT_ID"))));
    }

    #[test]
    fn test_invalid_client_id() {
        for bad in ["fleet/1", "fleet+", "#"] {
            let pairs = [("MQTT_CLIENT_ID", bad), ("MQTT_HOST_NAME", "h")];
            let result = ConnectionSettings::from_lookup(lookup_from(&pairs));
            assert!(
                matches!(result, Err(SettingsError::InvalidClientId(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_persistent_session_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("MQTT_CLEAN_SESSION", "False"));

        let result = ConnectionSettings::from_lookup(lookup_from(&pairs));
        assert!(matches!(result, Err(SettingsError::PersistentSession)));
    }

    #[test]
    fn test_invalid_numbers_and_booleans() {
        let cases = [
            ("MQTT_TCP_PORT", "not-a-port"),
            ("MQTT_TCP_PORT", "0"),
            ("MQTT_TCP_PORT", "70000"),
            ("MQTT_KEEP_ALIVE_IN_SECONDS", "3"),
            ("MQTT_KEEP_ALIVE_IN_SECONDS", "70000"),
            ("MQTT_USE_TLS", "maybe"),
        ];
        for (key, value) in cases {
            let mut pairs = REQUIRED.to_vec();
            pairs.push((key, value));
            let result = ConnectionSettings::from_lookup(lookup_from(&pairs));
            assert!(
                matches!(result, Err(SettingsError::InvalidValue { .. })),
                "{key}={value} should be rejected"
            );
        }
    }

    #[test]
    fn test_zero_keep_alive_allowed() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("MQTT_KEEP_ALIVE_IN_SECONDS", "0"));

        let settings = ConnectionSettings::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(settings.keep_alive_secs, 0);
    }

    #[test]
    fn test_tls_cert_requires_key() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("MQTT_USE_TLS", "1"));
        pairs.push(("MQTT_CERT_FILE", "/certs/client.pem"));

        let result = ConnectionSettings::from_lookup(lookup_from(&pairs));
        assert!(matches!(result, Err(SettingsError::InvalidConfig(_))));
    }

    #[test]
    fn test_encrypted_key_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("MQTT_USE_TLS", "true"));
        pairs.push(("MQTT_CERT_FILE", "/certs/client.pem"));
        pairs.push(("MQTT_KEY_FILE", "/certs/client.key"));
        pairs.push(("MQTT_KEY_FILE_PASSWORD", "hunter2"));

        let result = ConnectionSettings::from_lookup(lookup_from(&pairs));
        assert!(matches!(result, Err(SettingsError::InvalidConfig(_))));
    }

    #[test]
    fn test_redacted_masks_secrets() {
        let mut settings = ConnectionSettings::test_settings();
        settings.username = Some("fleet".to_string());
        settings.password = Some("s3cret".to_string());

        let redacted = settings.redacted();

        assert_eq!(redacted.username.as_deref(), Some("fleet"));
        assert_eq!(redacted.password.as_deref(), Some("***"));
        assert_eq!(redacted.key_file_password, None);
    }
}
