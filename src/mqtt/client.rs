use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, Incoming, LastWill, MqttOptions, QoS};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::telemetry::TelemetryReport;

pub struct MqttMessage {
    pub topic: String,
    pub payload: String,
}

pub struct MqttClient {
    client: AsyncClient,
    eventloop: EventLoop,
    config: Config,
}

impl MqttClient {
    pub fn new(config: &Config) -> Self {
        let mut mqttopts = MqttOptions::new(
            config.client_id(),
            &config.mqtt.broker_host,
            config.mqtt.broker_port,
        );
        mqttopts.set_keep_alive(Duration::from_secs(30));

        if let (Some(user), Some(pass)) = (&config.mqtt.username, &config.mqtt.password) {
            mqttopts.set_credentials(user, pass);
        }

        // LWT: the broker marks the device offline if the connection drops.
        let lwt = LastWill::new(
            config.availability_topic(),
            "offline".as_bytes().to_vec(),
            QoS::AtLeastOnce,
            true,
        );
        mqttopts.set_last_will(lwt);

        let (client, eventloop) = AsyncClient::new(mqttopts, 100);

        Self {
            client,
            eventloop,
            config: config.clone(),
        }
    }

    /// Run the MQTT event loop. Subscribes to the control topic on connect,
    /// forwards incoming control messages through `control_tx`, and publishes
    /// telemetry reports received from `report_rx`.
    pub async fn run(
        mut self,
        control_tx: mpsc::Sender<MqttMessage>,
        mut report_rx: mpsc::Receiver<TelemetryReport>,
    ) {
        loop {
            tokio::select! {
                event = self.eventloop.poll() => {
                    match event {
                        Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                            info!("Connected to MQTT broker");

                            let availability = self.config.availability_topic();
                            if let Err(e) = self
                                .client
                                .publish(&availability, QoS::AtLeastOnce, true, "online")
                                .await
                            {
                                error!("Failed to publish online status: {}", e);
                            }

                            let control = &self.config.mqtt.control_topic;
                            if let Err(e) =
                                self.client.subscribe(control, QoS::AtLeastOnce).await
                            {
                                error!("Failed to subscribe to {}: {}", control, e);
                            }
                        }
                        Ok(Event::Incoming(Incoming::Publish(publish))) => {
                            let payload = String::from_utf8_lossy(&publish.payload).to_string();
                            let msg = MqttMessage {
                                topic: publish.topic.clone(),
                                payload,
                            };
                            if control_tx.send(msg).await.is_err() {
                                warn!("Control channel closed");
                            }
                        }
                        Ok(_) => {}
                        Err(e) => {
                            error!("MQTT connection error: {}. Reconnecting...", e);
                            tokio::time::sleep(Duration::from_secs(5)).await;
                        }
                    }
                }
                Some(report) = report_rx.recv() => {
                    let topic = &self.config.mqtt.sensors_topic;
                    match serde_json::to_string(&report) {
                        Ok(json) => {
                            info!(
                                "Publishing {}: score={} status={}",
                                topic, report.class_score, report.status
                            );
                            if let Err(e) = self
                                .client
                                .publish(topic, QoS::AtMostOnce, false, json.into_bytes())
                                .await
                            {
                                warn!("Failed to publish {}: {}", topic, e);
                            }
                        }
                        Err(e) => error!("Failed to serialize telemetry report: {}", e),
                    }
                }
            }
        }
    }
}
