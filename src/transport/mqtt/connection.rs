//! Pure connection configuration for the MQTT client
//!
//! This module turns [`ConnectionSettings`] into `rumqttc` options, builds
//! topics, and names CONNACK result codes.

use crate::config::ConnectionSettings;
use rumqttc::{ConnectReturnCode, MqttOptions, TlsConfiguration, Transport};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Capacity of the request channel between the client handle and its event loop
pub const REQUEST_CHANNEL_CAPACITY: usize = 10;

/// MQTT transport errors
#[derive(Debug, Error)]
pub enum MqttError {
    #[error("Failed to read TLS file {path}")]
    TlsFileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid TLS configuration: {0}")]
    TlsConfig(String),
    #[error("Event loop already started")]
    AlreadyConnected,
    #[error("Publishing failed")]
    PublishFailed(#[source] rumqttc::ClientError),
    #[error("Disconnect request failed")]
    DisconnectFailed(#[source] rumqttc::ClientError),
}

/// Human-readable CONNACK result, in the wording brokers document
pub fn connack_reason(code: &ConnectReturnCode) -> &'static str {
    match code {
        ConnectReturnCode::Success => "Connection Accepted.",
        ConnectReturnCode::RefusedProtocolVersion => {
            "Connection Refused: unacceptable protocol version."
        }
        ConnectReturnCode::BadClientId => "Connection Refused: identifier rejected.",
        ConnectReturnCode::ServiceUnavailable => "Connection Refused: broker unavailable.",
        ConnectReturnCode::BadUserNamePassword => {
            "Connection Refused: bad user name or password."
        }
        ConnectReturnCode::NotAuthorized => "Connection Refused: not authorised.",
    }
}

/// Build `rumqttc` options from validated settings.
///
/// Sessions use MQTT 3.1.1 over TCP, optionally wrapped in TLS.
pub fn configure_mqtt_options(settings: &ConnectionSettings) -> Result<MqttOptions, MqttError> {
    let mut options = MqttOptions::new(
        settings.client_id.clone(),
        settings.host_name.clone(),
        settings.tcp_port,
    );
    options.set_keep_alive(Duration::from_secs(settings.keep_alive_secs));
    options.set_clean_session(settings.clean_session);

    if let Some(username) = &settings.username {
        let password = settings.password.clone().unwrap_or_default();
        options.set_credentials(username.clone(), password);
    }

    if settings.use_tls {
        options.set_transport(build_tls_transport(settings)?);
    }

    Ok(options)
}

/// Select the TLS transport: platform roots unless a CA bundle or client
/// certificate is configured.
fn build_tls_transport(settings: &ConnectionSettings) -> Result<Transport, MqttError> {
    let client_auth = match (&settings.cert_file, &settings.key_file) {
        (Some(cert), Some(key)) => Some((read_tls_file(cert)?, read_tls_file(key)?)),
        (Some(_), None) => {
            return Err(MqttError::TlsConfig(
                "client certificate configured without a private key".to_string(),
            ))
        }
        _ => None,
    };

    match (&settings.ca_file, client_auth) {
        (None, None) => Ok(Transport::tls_with_default_config()),
        (Some(ca), client_auth) => Ok(Transport::tls_with_config(TlsConfiguration::Simple {
            ca: read_tls_file(ca)?,
            alpn: None,
            client_auth,
        })),
        (None, Some(_)) => Err(MqttError::TlsConfig(
            "client certificates require MQTT_CA_FILE".to_string(),
        )),
    }
}

fn read_tls_file(path: &Path) -> Result<Vec<u8>, MqttError> {
    std::fs::read(path).map_err(|source| MqttError::TlsFileRead {
        path: path.to_path_buf(),
        source,
    })
}

/// Telemetry topic construction
pub struct TopicBuilder;

impl TopicBuilder {
    /// Build vehicle position topic: `vehicles/{client_id}/position`
    pub fn build_position_topic(client_id: &str) -> String {
        format!("vehicles/{client_id}/position")
    }
}
