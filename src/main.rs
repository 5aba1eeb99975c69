use log::{error, info, warn};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use zone_controller::actuator::{ActuatorBank, GpioRelayBank, RelayPolarity, SimulatedRelayBank};
use zone_controller::config::{self, Config};
use zone_controller::control::{Controller, StdoutStatusSink};
use zone_controller::input::mqtt::{MqttClient, OccupancyChannel};
use zone_controller::instance_lock::InstanceLock;
use zone_controller::occupancy::SharedOccupancy;
use zone_controller::sensors::{IioTemperatureSensor, SimulatedTemperature, TemperatureSource};

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn build_actuators(config: &Config) -> Box<dyn ActuatorBank> {
    match (&config.relays.led_gpio, &config.relays.fan_gpio) {
        (Some(led), Some(fan)) => {
            info!("  Relays: {} / {}", led.display(), fan.display());
            Box::new(GpioRelayBank::new(
                led,
                fan,
                RelayPolarity::from_active_low(config.relays.active_low),
            ))
        }
        _ => {
            warn!("  Relays: simulated (RELAY_LED_GPIO/RELAY_FAN_GPIO not set)");
            Box::new(SimulatedRelayBank::new())
        }
    }
}

fn build_sensor(config: &Config) -> Box<dyn TemperatureSource> {
    match &config.sensor.path {
        Some(path) => {
            info!("  Temperature: {}", path.display());
            Box::new(IioTemperatureSensor::new(path, config.sensor.divisor))
        }
        None => {
            warn!(
                "  Temperature: simulated at {:.1}°C (TEMP_SENSOR_PATH not set)",
                config.sensor.simulated_celsius
            );
            Box::new(SimulatedTemperature::new(config.sensor.simulated_celsius))
        }
    }
}

fn main() -> ExitCode {
    // Before the runtime starts any worker thread
    config::load_dotenv();
    init_logger();
    info!("Starting zone controller");

    let config = Config::from_env();
    if let Err(e) = config.validate() {
        error!("{}", e);
        return ExitCode::FAILURE;
    }

    let _lock = match InstanceLock::acquire(&config.mqtt.topic) {
        Ok(lock) => lock,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(run(config));
    ExitCode::SUCCESS
}

async fn run(config: Config) {
    info!("Configuration loaded:");
    info!(
        "  Broker: {}:{} (topic {})",
        config.mqtt.broker_host, config.mqtt.broker_port, config.mqtt.topic
    );
    info!(
        "  Comfort: {:.1}°C ± {:.1}°C, forced on at {} people, off {:?} after empty",
        config.control.comfort_celsius,
        config.control.hysteresis_celsius,
        config.control.min_occupancy_on,
        config.control.unoccupied_delay
    );

    // Relays go OFF before anything touches the network.
    let occupancy = Arc::new(SharedOccupancy::new());
    let controller = Controller::new(
        config.control,
        occupancy.clone(),
        build_sensor(&config),
        build_actuators(&config),
        StdoutStatusSink,
    );

    let channel = OccupancyChannel::new(config.mqtt.topic.clone(), occupancy);
    let mut mqtt = MqttClient::new(&config.mqtt);
    tokio::select! {
        _ = mqtt.wait_for_subscription(&channel) => {}
        _ = signal::ctrl_c() => {
            info!("Received shutdown signal before the occupancy channel came up");
            return;
        }
    }

    let cancel = CancellationToken::new();
    let mqtt_task = tokio::spawn(mqtt.run(channel, cancel.clone()));
    let control_task = tokio::spawn(controller.run(config.tick_interval, cancel.clone()));

    info!("Zone controller is running, press Ctrl+C to exit");

    match signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }

    cancel.cancel();
    if let Err(e) = control_task.await {
        error!("Control loop task failed: {}", e);
    }
    if let Err(e) = mqtt_task.await {
        error!("MQTT task failed: {}", e);
    }

    info!("Zone controller stopped");
}
