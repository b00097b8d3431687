//! Telemetry producer control flow
//!
//! Connects through a [`TelemetryClient`], waits for the coordinator to report
//! the session, publishes a fresh sample every interval until the shutdown
//! future resolves, and always finishes with a bounded disconnect.

use crate::error::{ProducerError, ProducerResult};
use crate::mqtt_span;
use crate::telemetry::{generate_vehicle_data, TelemetryEnvelope};
use crate::transport::mqtt::{ConnectionCoordinator, TopicBuilder};
use crate::transport::TelemetryClient;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn, Instrument};

/// Timing for one producer run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProducerOptions {
    pub publish_interval: Duration,
    pub connect_timeout: Duration,
    pub disconnect_timeout: Duration,
}

impl Default for ProducerOptions {
    fn default() -> Self {
        Self {
            publish_interval: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(10),
            disconnect_timeout: Duration::from_secs(5),
        }
    }
}

/// How a run that did not fail came to an end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    pub messages_published: u64,
    /// Whether the broker session was established before shutdown
    pub connected: bool,
}

pub struct TelemetryProducer<C: TelemetryClient> {
    client_id: String,
    client: C,
    coordinator: Arc<ConnectionCoordinator>,
    options: ProducerOptions,
    rng: StdRng,
}

impl<C: TelemetryClient> TelemetryProducer<C> {
    pub fn new(client_id: impl Into<String>, client: C, options: ProducerOptions) -> Self {
        Self::with_rng(client_id, client, options, StdRng::from_entropy())
    }

    /// Create a producer with a caller-supplied RNG for reproducible samples
    pub fn with_rng(
        client_id: impl Into<String>,
        client: C,
        options: ProducerOptions,
        rng: StdRng,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client,
            coordinator: Arc::new(ConnectionCoordinator::new()),
            options,
            rng,
        }
    }

    pub fn topic(&self) -> String {
        TopicBuilder::build_position_topic(&self.client_id)
    }

    pub fn coordinator(&self) -> &Arc<ConnectionCoordinator> {
        &self.coordinator
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Run until `shutdown` resolves or an error occurs.
    ///
    /// The disconnect path runs on every exit, success or failure.
    pub async fn run<F>(&mut self, shutdown: F) -> ProducerResult<RunOutcome>
    where
        F: Future<Output = ()>,
    {
        let span = mqtt_span!(operation = "session", client_id = %self.client_id);
        async move {
            let outcome = self.connect_and_publish(shutdown).await;
            if let Err(e) = &outcome {
                error!("Unexpected error: {}", e);
            }
            self.shutdown().await;
            outcome
        }
        .instrument(span)
        .await
    }

    async fn connect_and_publish<F>(&mut self, shutdown: F) -> ProducerResult<RunOutcome>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut outcome = RunOutcome {
            messages_published: 0,
            connected: false,
        };

        info!("{}: Starting connection", self.client_id);
        self.client
            .connect(self.coordinator.clone())
            .await
            .map_err(ProducerError::client)?;

        let connected = tokio::select! {
            _ = &mut shutdown => {
                info!("User initiated exit while connecting");
                return Ok(outcome);
            }
            result = self.coordinator.wait_for_connected(self.options.connect_timeout) => result?,
        };
        if !connected {
            error!("{}: failed to connect, exiting", self.client_id);
            return Err(ProducerError::connect_timeout(self.options.connect_timeout));
        }
        outcome.connected = true;

        let topic = self.topic();
        loop {
            let envelope = TelemetryEnvelope::new(generate_vehicle_data(&mut self.rng));
            let payload = envelope.to_payload()?;

            // The request queue is bounded, so enqueueing can block
            let message_id = tokio::select! {
                _ = &mut shutdown => {
                    info!("User initiated exit while publishing");
                    break;
                }
                result = self.client.publish(&topic, payload.clone().into_bytes()) => {
                    result.map_err(ProducerError::client)?
                }
            };
            outcome.messages_published += 1;
            info!(
                "Sending publish with payload \"{}\" on topic \"{}\" with message id {}",
                payload, topic, message_id
            );

            tokio::select! {
                _ = &mut shutdown => {
                    info!("User initiated exit");
                    break;
                }
                _ = tokio::time::sleep(self.options.publish_interval) => {}
            }
        }

        Ok(outcome)
    }

    /// Best-effort disconnect bounded by the disconnect timeout
    async fn shutdown(&mut self) {
        info!("Shutting down....");
        info!("{}: Disconnecting", self.client_id);

        if let Err(e) = self.client.disconnect().await {
            warn!("Disconnect request failed: {}", e);
        }

        let timeout = self.options.disconnect_timeout;
        if let Some(id) = self.coordinator.last_acked() {
            info!("{}: last acknowledged message id {}", self.client_id, id);
        }
        if self.coordinator.wait_for_disconnected(timeout).await {
            info!("{}: Disconnected", self.client_id);
        } else {
            warn!(
                "{}: disconnect not confirmed within {:?}",
                self.client_id, timeout
            );
        }
    }
}
