mod actuators;
mod config;
mod control;
mod engine;
mod mqtt;
mod sensors;
mod telemetry;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use actuators::{Actuator, ActuatorBank, LoggingActuatorBus};
use control::ControlCommand;
use engine::Engine;
use sensors::bus::{SensorBus, SimulatedBus};
use sensors::sampler::Sampler;
use sensors::{Metric, Sample};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = match config::Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Starting classguard-agent (device={}, network={}, mqtt={}:{})",
        config.device_id, config.wifi.ssid, config.mqtt.broker_host, config.mqtt.broker_port,
    );
    for (name, pin) in config.pins.all() {
        info!("  {} on pin {}", name, pin);
    }

    // Channels
    let (control_tx, mut control_rx) = mpsc::channel::<mqtt::client::MqttMessage>(100);
    let (sample_tx, mut sample_rx) = mpsc::channel::<Sample>(100);
    let (report_tx, report_rx) = mpsc::channel::<telemetry::TelemetryReport>(20);

    // MQTT client task handles both broker I/O and telemetry publishing
    let mqtt_client = mqtt::client::MqttClient::new(&config);
    let mqtt_handle = tokio::spawn(async move {
        mqtt_client.run(control_tx, report_rx).await;
    });

    // One sampler task per metric over the shared sensor bus
    let bus: Arc<dyn SensorBus> = Arc::new(SimulatedBus::new());
    let sample_interval = Duration::from_secs(config.sampling.sample_interval_secs);
    let mut sampler_handles = Vec::new();

    for metric in Metric::ALL {
        let sampler = Sampler::new(
            metric,
            metric.pin(&config.pins),
            sample_interval,
            Arc::clone(&bus),
        );
        sampler_handles.push(tokio::spawn(sampler.run(sample_tx.clone())));
    }

    // Drop the original sender so the channel closes when all samplers finish
    drop(sample_tx);

    let mut engine = Engine::new(&config.device_id, &config.thresholds, &config.sampling);
    let mut bank = ActuatorBank::new(&config.pins, Box::new(LoggingActuatorBus));

    let mut publish_timer =
        tokio::time::interval(Duration::from_secs(config.sampling.publish_interval_secs));
    // Skip the immediate first tick; nothing has been sampled yet
    publish_timer.tick().await;

    // Main loop: evaluate samples, publish snapshots, handle control + shutdown
    loop {
        tokio::select! {
            Some(sample) = sample_rx.recv() => {
                if let Some(transition) = engine.observe(&sample) {
                    if transition.entered {
                        warn!(
                            "{} alert: {:.1} {} crossed the {} bound",
                            transition.metric.name(),
                            transition.value,
                            transition.metric.unit(),
                            if transition.metric == Metric::Lux { "lower" } else { "upper" },
                        );
                    } else {
                        info!(
                            "{} alert cleared at {:.1} {}",
                            transition.metric.name(),
                            transition.value,
                            transition.metric.unit(),
                        );
                    }
                    apply_demands(&engine, &mut bank);
                }
            }
            _ = publish_timer.tick() => {
                let report = engine.snapshot(chrono::Utc::now());
                if report_tx.send(report).await.is_err() {
                    warn!("Telemetry channel closed");
                }
            }
            Some(msg) = control_rx.recv() => {
                match ControlCommand::parse(&msg.payload) {
                    Ok(command) => {
                        info!("Control command on {}: {:?}", msg.topic, command);
                        if command.release_overrides {
                            bank.release_overrides();
                            apply_demands(&engine, &mut bank);
                        }
                        for (actuator, requested) in [
                            (Actuator::Fan, command.fan),
                            (Actuator::Light, command.light),
                            (Actuator::Buzzer, command.buzzer),
                        ] {
                            if let Some(on) = requested {
                                bank.set_manual(actuator, on);
                            }
                        }
                        info!("Outputs: {}", bank.summary());
                    }
                    Err(e) => {
                        warn!("Ignoring control message on {}: {}", msg.topic, e);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received SIGINT, shutting down");
                break;
            }
            _ = async {
                let mut sigterm = tokio::signal::unix::signal(
                    tokio::signal::unix::SignalKind::terminate()
                ).expect("Failed to register SIGTERM handler");
                sigterm.recv().await;
            } => {
                info!("Received SIGTERM, shutting down");
                break;
            }
        }
    }

    // Cleanup
    for handle in sampler_handles {
        handle.abort();
    }
    mqtt_handle.abort();
    info!("classguard-agent stopped");
}

/// Push the engine's current demands to every output still in auto mode.
fn apply_demands(engine: &Engine, bank: &mut ActuatorBank) {
    bank.apply_auto(Actuator::Fan, engine.fan_demand());
    bank.apply_auto(Actuator::Light, engine.light_demand());
    bank.apply_auto(Actuator::Buzzer, engine.buzzer_demand());
}
