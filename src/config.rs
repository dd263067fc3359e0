use std::env;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub device_id: String,
    pub wifi: WifiConfig,
    pub mqtt: MqttConfig,
    pub pins: PinConfig,
    pub thresholds: Thresholds,
    pub sampling: SamplingConfig,
}

/// Credentials of the network the node lives on. Association itself is the
/// platform's job; the agent only carries the provisioning values.
#[derive(Debug, Clone, PartialEq)]
pub struct WifiConfig {
    pub ssid: String,
    pub psk: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MqttConfig {
    pub broker_host: String,
    pub broker_port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Client-id prefix; the device id is appended to make the id unique.
    pub client_id_prefix: String,
    pub sensors_topic: String,
    pub control_topic: String,
}

/// GPIO assignments of the classroom node this agent fronts.
#[derive(Debug, Clone, PartialEq)]
pub struct PinConfig {
    pub mq135: u8,
    pub sda: u8,
    pub scl: u8,
    pub dht: u8,
    pub mic: u8,
    pub relay_fan: u8,
    pub relay_light: u8,
    pub buzzer: u8,
}

impl PinConfig {
    pub fn all(&self) -> [(&'static str, u8); 8] {
        [
            ("MQ135", self.mq135),
            ("SDA", self.sda),
            ("SCL", self.scl),
            ("DHT", self.dht),
            ("MIC", self.mic),
            ("RELAY_FAN", self.relay_fan),
            ("RELAY_LIGHT", self.relay_light),
            ("BUZZER", self.buzzer),
        ]
    }
}

/// Alert comparison bounds. CO2, temperature, humidity and noise alert when
/// the reading is at or above the bound; lux alerts when at or below it
/// (the room is too dark).
#[derive(Debug, Clone, PartialEq)]
pub struct Thresholds {
    pub co2_ppm: f64,
    pub lux: f64,
    pub temp_c: f64,
    pub humidity_pct: f64,
    pub noise_db: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SamplingConfig {
    pub sample_interval_secs: u64,
    pub publish_interval_secs: u64,
    /// Consecutive out-of-bounds samples before a metric enters alert,
    /// and consecutive recovered samples before it leaves.
    pub debounce_samples: u32,
    /// A metric leaves alert only once it has recovered past the threshold
    /// by this margin.
    pub release_margin_pct: f64,
}

fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device_id: "A101".to_string(),
            wifi: WifiConfig {
                ssid: "YOUR_WIFI_SSID".to_string(),
                psk: "YOUR_WIFI_PASSWORD".to_string(),
            },
            mqtt: MqttConfig {
                broker_host: "broker.hivemq.com".to_string(),
                broker_port: 1883,
                username: None,
                password: None,
                client_id_prefix: "ESP32_CLASSGUARD_".to_string(),
                sensors_topic: "classguard/sensors".to_string(),
                control_topic: "classguard/control".to_string(),
            },
            pins: PinConfig {
                mq135: 34,
                sda: 21,
                scl: 22,
                dht: 4,
                mic: 35,
                relay_fan: 26,
                relay_light: 27,
                buzzer: 25,
            },
            thresholds: Thresholds {
                co2_ppm: 1000.0,
                lux: 300.0,
                temp_c: 35.0,
                humidity_pct: 80.0,
                noise_db: 70.0,
            },
            sampling: SamplingConfig {
                sample_interval_secs: 5,
                publish_interval_secs: 30,
                debounce_samples: 3,
                release_margin_pct: 5.0,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let defaults = Config::default();

        let config = Self {
            device_id: env_or_default("CLASSGUARD_DEVICE_ID", defaults.device_id),
            wifi: WifiConfig {
                ssid: env_or_default("CLASSGUARD_WIFI_SSID", defaults.wifi.ssid),
                psk: env_or_default("CLASSGUARD_WIFI_PSK", defaults.wifi.psk),
            },
            mqtt: MqttConfig {
                broker_host: env_or_default(
                    "CLASSGUARD_MQTT_BROKER_HOST",
                    defaults.mqtt.broker_host,
                ),
                broker_port: env_or_default("CLASSGUARD_MQTT_BROKER_PORT", 1883),
                username: env_optional("CLASSGUARD_MQTT_USERNAME"),
                password: env_optional("CLASSGUARD_MQTT_PASSWORD"),
                client_id_prefix: env_or_default(
                    "CLASSGUARD_MQTT_CLIENT_ID_PREFIX",
                    defaults.mqtt.client_id_prefix,
                ),
                sensors_topic: env_or_default(
                    "CLASSGUARD_MQTT_SENSORS_TOPIC",
                    defaults.mqtt.sensors_topic,
                ),
                control_topic: env_or_default(
                    "CLASSGUARD_MQTT_CONTROL_TOPIC",
                    defaults.mqtt.control_topic,
                ),
            },
            pins: PinConfig {
                mq135: env_or_default("CLASSGUARD_PIN_MQ135", defaults.pins.mq135),
                sda: env_or_default("CLASSGUARD_PIN_SDA", defaults.pins.sda),
                scl: env_or_default("CLASSGUARD_PIN_SCL", defaults.pins.scl),
                dht: env_or_default("CLASSGUARD_PIN_DHT", defaults.pins.dht),
                mic: env_or_default("CLASSGUARD_PIN_MIC", defaults.pins.mic),
                relay_fan: env_or_default("CLASSGUARD_PIN_RELAY_FAN", defaults.pins.relay_fan),
                relay_light: env_or_default(
                    "CLASSGUARD_PIN_RELAY_LIGHT",
                    defaults.pins.relay_light,
                ),
                buzzer: env_or_default("CLASSGUARD_PIN_BUZZER", defaults.pins.buzzer),
            },
            thresholds: Thresholds {
                co2_ppm: env_or_default(
                    "CLASSGUARD_CO2_THRESHOLD_PPM",
                    defaults.thresholds.co2_ppm,
                ),
                lux: env_or_default("CLASSGUARD_LUX_THRESHOLD", defaults.thresholds.lux),
                temp_c: env_or_default("CLASSGUARD_TEMP_THRESHOLD_C", defaults.thresholds.temp_c),
                humidity_pct: env_or_default(
                    "CLASSGUARD_HUMIDITY_THRESHOLD_PCT",
                    defaults.thresholds.humidity_pct,
                ),
                noise_db: env_or_default(
                    "CLASSGUARD_NOISE_THRESHOLD_DB",
                    defaults.thresholds.noise_db,
                ),
            },
            sampling: SamplingConfig {
                sample_interval_secs: env_or_default(
                    "CLASSGUARD_SAMPLE_INTERVAL_SECS",
                    defaults.sampling.sample_interval_secs,
                ),
                publish_interval_secs: env_or_default(
                    "CLASSGUARD_PUBLISH_INTERVAL_SECS",
                    defaults.sampling.publish_interval_secs,
                ),
                debounce_samples: env_or_default(
                    "CLASSGUARD_ALERT_DEBOUNCE_SAMPLES",
                    defaults.sampling.debounce_samples,
                ),
                release_margin_pct: env_or_default(
                    "CLASSGUARD_ALERT_RELEASE_MARGIN_PCT",
                    defaults.sampling.release_margin_pct,
                ),
            },
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.device_id.is_empty() {
            return Err("CLASSGUARD_DEVICE_ID must not be empty".into());
        }
        if self.wifi.ssid.is_empty() {
            return Err("CLASSGUARD_WIFI_SSID must not be empty".into());
        }
        if self.wifi.psk.is_empty() {
            return Err("CLASSGUARD_WIFI_PSK must not be empty".into());
        }
        if self.mqtt.broker_host.is_empty() {
            return Err("CLASSGUARD_MQTT_BROKER_HOST must not be empty".into());
        }
        if self.mqtt.broker_port == 0 {
            return Err("CLASSGUARD_MQTT_BROKER_PORT must be a valid TCP port".into());
        }
        if self.mqtt.sensors_topic.is_empty() || self.mqtt.control_topic.is_empty() {
            return Err("MQTT topics must not be empty".into());
        }
        if self.mqtt.sensors_topic == self.mqtt.control_topic {
            return Err("sensors and control topics must differ".into());
        }

        let pins = self.pins.all();
        for (i, (name_a, pin_a)) in pins.iter().enumerate() {
            for (name_b, pin_b) in &pins[i + 1..] {
                if pin_a == pin_b {
                    return Err(format!(
                        "pin {pin_a} is assigned to both {name_a} and {name_b}"
                    ));
                }
            }
        }

        for (name, value) in [
            ("CO2", self.thresholds.co2_ppm),
            ("LUX", self.thresholds.lux),
            ("TEMP", self.thresholds.temp_c),
            ("HUMIDITY", self.thresholds.humidity_pct),
            ("NOISE", self.thresholds.noise_db),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(format!("{name} threshold must be a positive finite number"));
            }
        }

        if self.sampling.sample_interval_secs == 0 {
            return Err("CLASSGUARD_SAMPLE_INTERVAL_SECS must be > 0".into());
        }
        if self.sampling.publish_interval_secs == 0 {
            return Err("CLASSGUARD_PUBLISH_INTERVAL_SECS must be > 0".into());
        }
        if self.sampling.debounce_samples == 0 {
            return Err("CLASSGUARD_ALERT_DEBOUNCE_SAMPLES must be > 0".into());
        }
        if !self.sampling.release_margin_pct.is_finite() || self.sampling.release_margin_pct < 0.0 {
            return Err("CLASSGUARD_ALERT_RELEASE_MARGIN_PCT must be >= 0".into());
        }
        Ok(())
    }

    /// Full MQTT client id: the configured prefix with the device id appended.
    pub fn client_id(&self) -> String {
        format!("{}{}", self.mqtt.client_id_prefix, self.device_id)
    }

    /// Retained online/offline presence topic, under the same root as the
    /// sensors topic: `classguard/status/{device_id}`.
    pub fn availability_topic(&self) -> String {
        let root = self
            .mqtt
            .sensors_topic
            .split('/')
            .next()
            .unwrap_or(self.mqtt.sensors_topic.as_str());
        format!("{}/status/{}", root, self.device_id)
    }
}
