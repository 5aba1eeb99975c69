//! MQTT client wrapper for the occupancy channel.

use super::occupancy::OccupancyChannel;
use crate::config::MqttConfig;
use log::{debug, error, info, warn};
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS, SubscribeReasonCode};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Build broker options from configuration.
pub fn mqtt_options(config: &MqttConfig, client_id: &str) -> MqttOptions {
    let mut options = MqttOptions::new(client_id, &config.broker_host, config.broker_port);
    options.set_keep_alive(config.keep_alive);
    options.set_clean_session(true);

    // Set credentials if provided
    if let (Some(username), Some(password)) = (&config.username, &config.password) {
        options.set_credentials(username, password);
    }

    options
}

/// What an incoming packet meant for the subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Progress {
    Connected,
    Subscribed,
    SubscriptionRejected,
    Other,
}

/// MQTT client feeding an [`OccupancyChannel`].
pub struct MqttClient {
    client: AsyncClient,
    event_loop: EventLoop,
    retry_delay: Duration,
}

impl MqttClient {
    /// Create a new MQTT client from configuration.
    ///
    /// No network traffic happens until the event loop is polled.
    pub fn new(config: &MqttConfig) -> Self {
        let options = mqtt_options(config, &config.client_id);
        let (client, event_loop) = AsyncClient::new(options, 10);

        Self {
            client,
            event_loop,
            retry_delay: config.retry_delay,
        }
    }

    /// Connect and subscribe, retrying with a fixed delay until the broker
    /// confirms the subscription.
    ///
    /// Messages that arrive in the meantime (such as the retained count) are
    /// handed to `channel`.
    pub async fn wait_for_subscription(&mut self, channel: &OccupancyChannel) {
        info!("[MQTT] Connecting, waiting for subscription to {}", channel.topic());

        loop {
            match self.event_loop.poll().await {
                Ok(event) => match handle_event(&self.client, event, channel).await {
                    Progress::Subscribed => {
                        info!("[MQTT] Subscribed to {}", channel.topic());
                        return;
                    }
                    Progress::SubscriptionRejected => {
                        warn!(
                            "[MQTT] Subscription to {} rejected, retrying in {:?}",
                            channel.topic(),
                            self.retry_delay
                        );
                        tokio::time::sleep(self.retry_delay).await;
                        subscribe(&self.client, channel).await;
                    }
                    Progress::Connected | Progress::Other => {}
                },
                Err(e) => {
                    warn!(
                        "[MQTT] Broker unavailable ({}), retrying in {:?}",
                        e, self.retry_delay
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }
    }

    /// Run the MQTT event loop until `cancel` fires.
    ///
    /// Reconnects after errors and re-subscribes on every new session.
    pub async fn run(mut self, channel: OccupancyChannel, cancel: CancellationToken) {
        info!("[MQTT] Starting event loop");

        loop {
            let polled = tokio::select! {
                _ = cancel.cancelled() => break,
                polled = self.event_loop.poll() => polled,
            };

            match polled {
                Ok(event) => {
                    if handle_event(&self.client, event, &channel).await
                        == Progress::SubscriptionRejected
                    {
                        warn!("[MQTT] Subscription to {} rejected", channel.topic());
                    }
                }
                Err(e) => {
                    error!("[MQTT] Connection error: {:?}", e);
                    // Wait before reconnecting
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(self.retry_delay) => {}
                    }
                }
            }
        }

        if let Err(e) = self.client.try_disconnect() {
            debug!("[MQTT] Disconnect failed: {}", e);
        }
        info!("[MQTT] Event loop stopped");
    }
}

/// Handle one event, subscribing again whenever a new session starts.
///
/// Takes the `AsyncClient` rather than the whole wrapper so the future stays
/// `Send` (the event loop is not `Sync`).
async fn handle_event(
    client: &AsyncClient,
    event: Event,
    channel: &OccupancyChannel,
) -> Progress {
    let Event::Incoming(packet) = event else {
        return Progress::Other;
    };

    let progress = handle_packet(packet, channel, Instant::now());
    if progress == Progress::Connected {
        info!("[MQTT] Connected to broker");
        subscribe(client, channel).await;
    }
    progress
}

/// Classify an incoming packet and route publishes into `channel`.
fn handle_packet(packet: Packet, channel: &OccupancyChannel, arrived_at: Instant) -> Progress {
    match packet {
        Packet::ConnAck(_) => Progress::Connected,
        Packet::SubAck(ack) => {
            let accepted = ack
                .return_codes
                .iter()
                .all(|code| matches!(code, SubscribeReasonCode::Success(_)));
            if accepted {
                Progress::Subscribed
            } else {
                Progress::SubscriptionRejected
            }
        }
        Packet::Publish(publish) => {
            if !channel.process_message(&publish.topic, &publish.payload, arrived_at) {
                debug!("[MQTT] Ignoring message on {}", publish.topic);
            }
            Progress::Other
        }
        _ => Progress::Other,
    }
}

async fn subscribe(client: &AsyncClient, channel: &OccupancyChannel) {
    info!("[MQTT] Subscribing to topic: {}", channel.topic());
    if let Err(e) = client.subscribe(channel.topic(), QoS::AtLeastOnce).await {
        warn!("[MQTT] Failed to subscribe to {}: {:?}", channel.topic(), e);
    }
}
