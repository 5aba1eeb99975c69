//! Development tool that stands in for the vision sensor.
//!
//! Publishes an occupancy count in the sensor's wire format (retained,
//! QoS 1) so the controller can be exercised without a camera.
//!
//! Usage:
//!   cargo run --bin occupancy-publish -- 3
//!   cargo run --bin occupancy-publish -- --raw '{"count": "oops"}'

use clap::Parser;
use log::{error, info, warn};
use rumqttc::{AsyncClient, Event, Outgoing, Packet, QoS};
use std::process::ExitCode;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use zone_controller::config::{self, Config};
use zone_controller::input::mqtt::mqtt_options;

#[derive(Parser)]
#[command(name = "occupancy-publish")]
#[command(about = "Publish an occupancy count the way the vision sensor does")]
struct Cli {
    /// People count to publish
    #[arg(required_unless_present = "raw")]
    count: Option<u32>,

    /// Send the count as a JSON string instead of a number
    #[arg(long)]
    as_string: bool,

    /// Publish this payload verbatim (for testing rejection paths)
    #[arg(long, conflicts_with = "count")]
    raw: Option<String>,

    /// Topic override (defaults to MQTT_TOPIC)
    #[arg(long, env = "MQTT_TOPIC")]
    topic: Option<String>,

    /// Seconds to wait for the broker to acknowledge
    #[arg(long, default_value_t = 10)]
    timeout: u64,
}

fn payload(cli: &Cli) -> String {
    if let Some(raw) = &cli.raw {
        return raw.clone();
    }

    let count = cli.count.unwrap_or_default();
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    let count = if cli.as_string {
        serde_json::Value::from(count.to_string())
    } else {
        serde_json::Value::from(count)
    };

    serde_json::json!({ "count": count, "timestamp": timestamp }).to_string()
}

#[tokio::main]
async fn main() -> ExitCode {
    config::load_dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = Config::from_env();
    let topic = cli.topic.clone().unwrap_or(config.mqtt.topic.clone());
    let payload = payload(&cli);

    let client_id = format!("{}-publisher", config.mqtt.client_id);
    let (client, mut event_loop) = AsyncClient::new(mqtt_options(&config.mqtt, &client_id), 10);

    info!(
        "Publishing to {}:{} {} -> {}",
        config.mqtt.broker_host, config.mqtt.broker_port, topic, payload
    );
    if let Err(e) = client
        .publish(&topic, QoS::AtLeastOnce, true, payload.into_bytes())
        .await
    {
        error!("Failed to queue publish: {}", e);
        return ExitCode::FAILURE;
    }

    let acked = tokio::time::timeout(Duration::from_secs(cli.timeout), async {
        loop {
            match event_loop.poll().await {
                Ok(Event::Incoming(Packet::PubAck(_))) => return Ok(()),
                Ok(_) => {}
                Err(e) => return Err(e),
            }
        }
    })
    .await;

    match acked {
        Ok(Ok(())) => {
            info!("Broker acknowledged the count");
            if let Err(e) = client.disconnect().await {
                warn!("Disconnect failed: {}", e);
            } else {
                // The request is only queued until the event loop sends it.
                let flushed = tokio::time::timeout(Duration::from_secs(1), async {
                    loop {
                        match event_loop.poll().await {
                            Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                            Ok(_) => {}
                        }
                    }
                })
                .await;
                if flushed.is_err() {
                    warn!("Disconnect was not sent before the timeout");
                }
            }
            ExitCode::SUCCESS
        }
        Ok(Err(e)) => {
            error!("MQTT connection error: {}", e);
            ExitCode::FAILURE
        }
        Err(_) => {
            error!("No acknowledgement after {} seconds", cli.timeout);
            ExitCode::FAILURE
        }
    }
}
