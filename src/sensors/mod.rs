pub mod bus;
pub mod sampler;

use chrono::{DateTime, Utc};

use crate::config::PinConfig;

/// The five classroom metrics the agent watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Co2,
    Lux,
    Temperature,
    Humidity,
    Noise,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::Co2,
        Metric::Lux,
        Metric::Temperature,
        Metric::Humidity,
        Metric::Noise,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::Co2 => "co2",
            Metric::Lux => "lux",
            Metric::Temperature => "temperature",
            Metric::Humidity => "humidity",
            Metric::Noise => "noise",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Metric::Co2 => "ppm",
            Metric::Lux => "lx",
            Metric::Temperature => "°C",
            Metric::Humidity => "%",
            Metric::Noise => "dB",
        }
    }

    /// Data pin the metric's peripheral is wired to. Lux comes from the
    /// BH1750 on the I2C bus, so its data pin is SDA; temperature and
    /// humidity share the DHT22 pin.
    pub fn pin(&self, pins: &PinConfig) -> u8 {
        match self {
            Metric::Co2 => pins.mq135,
            Metric::Lux => pins.sda,
            Metric::Temperature | Metric::Humidity => pins.dht,
            Metric::Noise => pins.mic,
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Metric::Co2 => 0,
            Metric::Lux => 1,
            Metric::Temperature => 2,
            Metric::Humidity => 3,
            Metric::Noise => 4,
        }
    }
}

/// One reading from a sensor, ready for threshold evaluation.
#[derive(Debug, Clone)]
pub struct Sample {
    pub metric: Metric,
    pub value: f64,
    pub taken_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_indices_are_distinct_and_dense() {
        let mut seen = [false; Metric::ALL.len()];
        for metric in Metric::ALL {
            assert!(!seen[metric.index()]);
            seen[metric.index()] = true;
        }
    }

    #[test]
    fn metric_pins_follow_wiring() {
        let pins = crate::config::Config::default().pins;
        assert_eq!(Metric::Co2.pin(&pins), 34);
        assert_eq!(Metric::Lux.pin(&pins), 21);
        assert_eq!(Metric::Temperature.pin(&pins), 4);
        assert_eq!(Metric::Humidity.pin(&pins), 4);
        assert_eq!(Metric::Noise.pin(&pins), 35);
    }
}
