//! Impure I/O operations for the MQTT client
//!
//! This module owns the `rumqttc` client handle and runs its event loop on a
//! dedicated task that forwards lifecycle events to a [`ConnectionCoordinator`].

use super::connection::{configure_mqtt_options, MqttError, REQUEST_CHANNEL_CAPACITY};
use super::coordinator::ConnectionCoordinator;
use super::message_handler::{EventRoute, MessageHandler};
use crate::config::ConnectionSettings;
use crate::transport::{MessageId, TelemetryClient};
use async_trait::async_trait;
use rumqttc::{AsyncClient, EventLoop, QoS};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// MQTT client publishing telemetry with QoS 0
pub struct MqttTelemetryClient {
    client_id: String,
    client: AsyncClient,
    // Taken by the delivery task on connect; the mutex makes the client Sync
    event_loop: Mutex<Option<EventLoop>>,
    event_loop_handle: Option<JoinHandle<()>>,
    next_message_id: AtomicU64,
}

impl MqttTelemetryClient {
    pub fn new(settings: &ConnectionSettings) -> Result<Self, MqttError> {
        let mqtt_options = configure_mqtt_options(settings)?;
        let (client, event_loop) = AsyncClient::new(mqtt_options, REQUEST_CHANNEL_CAPACITY);

        Ok(Self {
            client_id: settings.client_id.clone(),
            client,
            event_loop: Mutex::new(Some(event_loop)),
            event_loop_handle: None,
            next_message_id: AtomicU64::new(0),
        })
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Poll the event loop until the session ends, dispatching each result to
    /// the coordinator. Runs on its own task; never returns an error.
    async fn run_event_loop(
        client_id: String,
        mut event_loop: EventLoop,
        coordinator: Arc<ConnectionCoordinator>,
    ) {
        info!("Starting MQTT event loop for client: {}", client_id);
        let mut publishes_sent = 0u64;

        loop {
            let result = event_loop.poll().await;
            let route = MessageHandler::route_poll_result(&result);
            Self::dispatch_route(&route, &coordinator, &mut publishes_sent);
            if !route.continues_session() {
                break;
            }
        }

        info!("MQTT event loop stopped for client: {}", client_id);
    }

    /// Apply a routed event to the coordinator.
    ///
    /// Publishes are written in request order, so counting them reproduces the
    /// ids handed out by [`TelemetryClient::publish`].
    fn dispatch_route(
        route: &EventRoute,
        coordinator: &ConnectionCoordinator,
        publishes_sent: &mut u64,
    ) {
        match route {
            EventRoute::ConnectResult(code) => coordinator.on_connect_result(*code),
            EventRoute::PublishSent => {
                *publishes_sent += 1;
                coordinator.on_publish_ack(MessageId(*publishes_sent));
            }
            EventRoute::Disconnected(reason) => coordinator.on_disconnect_result(reason),
            EventRoute::TransportError(reason) => coordinator.on_transport_error(reason),
            EventRoute::InfrastructureEvent(event) => {
                debug!(target: "mqtt_transport", "MQTT event: {}", event);
            }
        }
    }
}

#[async_trait]
impl TelemetryClient for MqttTelemetryClient {
    type Error = MqttError;

    async fn connect(&mut self, coordinator: Arc<ConnectionCoordinator>) -> Result<(), MqttError> {
        let event_loop = self
            .event_loop
            .get_mut()
            .take()
            .ok_or(MqttError::AlreadyConnected)?;
        let handle = tokio::spawn(Self::run_event_loop(
            self.client_id.clone(),
            event_loop,
            coordinator,
        ));
        self.event_loop_handle = Some(handle);
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<MessageId, MqttError> {
        self.client
            .publish(topic, QoS::AtMostOnce, false, payload)
            .await
            .map_err(MqttError::PublishFailed)?;
        let id = self.next_message_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(MessageId(id))
    }

    async fn disconnect(&mut self) -> Result<(), MqttError> {
        self.client
            .disconnect()
            .await
            .map_err(MqttError::DisconnectFailed)
    }
}

impl Drop for MqttTelemetryClient {
    fn drop(&mut self) {
        if let Some(handle) = self.event_loop_handle.take() {
            handle.abort();
        }
    }
}
