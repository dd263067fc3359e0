use chrono::{DateTime, Utc};

use crate::config::{SamplingConfig, Thresholds};
use crate::sensors::{Metric, Sample};
use crate::telemetry::{self, TelemetryReport};

/// Which side of the threshold is the bad side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Upper,
    Lower,
}

/// Per-metric alert state machine. A metric enters alert after `debounce`
/// consecutive out-of-bounds samples and leaves it after `debounce`
/// consecutive samples recovered past the threshold by `release_margin`.
#[derive(Debug)]
pub struct AlertMonitor {
    threshold: f64,
    bound: Bound,
    debounce: u32,
    release_margin: f64,
    in_alert: bool,
    streak: u32,
}

impl AlertMonitor {
    fn new(threshold: f64, bound: Bound, debounce: u32, release_margin_pct: f64) -> Self {
        Self {
            threshold,
            bound,
            debounce,
            release_margin: release_margin_pct / 100.0,
            in_alert: false,
            streak: 0,
        }
    }

    fn breached(&self, value: f64) -> bool {
        match self.bound {
            Bound::Upper => value >= self.threshold,
            Bound::Lower => value <= self.threshold,
        }
    }

    fn recovered(&self, value: f64) -> bool {
        match self.bound {
            Bound::Upper => value < self.threshold * (1.0 - self.release_margin),
            Bound::Lower => value > self.threshold * (1.0 + self.release_margin),
        }
    }

    /// Feed one sample. Returns `Some(true)` on entering alert, `Some(false)`
    /// on clearing, `None` otherwise.
    pub fn observe(&mut self, value: f64) -> Option<bool> {
        let qualifies = if self.in_alert {
            self.recovered(value)
        } else {
            self.breached(value)
        };

        if !qualifies {
            self.streak = 0;
            return None;
        }

        self.streak += 1;
        if self.streak < self.debounce {
            return None;
        }

        self.streak = 0;
        self.in_alert = !self.in_alert;
        Some(self.in_alert)
    }

    pub fn in_alert(&self) -> bool {
        self.in_alert
    }
}

/// Alert state of every metric at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertFlags {
    pub co2: bool,
    pub light: bool,
    pub temperature: bool,
    pub humidity: bool,
    pub noise: bool,
}

/// A metric crossing into or out of alert.
#[derive(Debug, Clone, Copy)]
pub struct Transition {
    pub metric: Metric,
    pub entered: bool,
    pub value: f64,
}

/// Threshold evaluation over the incoming sample stream. Holds the latest
/// value per metric for telemetry snapshots.
pub struct Engine {
    device_id: String,
    monitors: [AlertMonitor; 5],
    latest: [Option<f64>; 5],
    last_sample_at: Option<DateTime<Utc>>,
}

impl Engine {
    pub fn new(device_id: &str, thresholds: &Thresholds, sampling: &SamplingConfig) -> Self {
        let monitor = |threshold: f64, bound: Bound| {
            AlertMonitor::new(
                threshold,
                bound,
                sampling.debounce_samples,
                sampling.release_margin_pct,
            )
        };
        // Indexed by Metric::index(). Lux is a darkness bound: alert below it.
        let monitors = [
            monitor(thresholds.co2_ppm, Bound::Upper),
            monitor(thresholds.lux, Bound::Lower),
            monitor(thresholds.temp_c, Bound::Upper),
            monitor(thresholds.humidity_pct, Bound::Upper),
            monitor(thresholds.noise_db, Bound::Upper),
        ];

        Self {
            device_id: device_id.to_string(),
            monitors,
            latest: [None; 5],
            last_sample_at: None,
        }
    }

    pub fn observe(&mut self, sample: &Sample) -> Option<Transition> {
        let idx = sample.metric.index();
        self.latest[idx] = Some(sample.value);
        self.last_sample_at = Some(sample.taken_at);
        self.monitors[idx]
            .observe(sample.value)
            .map(|entered| Transition {
                metric: sample.metric,
                entered,
                value: sample.value,
            })
    }

    pub fn alert_flags(&self) -> AlertFlags {
        AlertFlags {
            co2: self.monitors[Metric::Co2.index()].in_alert(),
            light: self.monitors[Metric::Lux.index()].in_alert(),
            temperature: self.monitors[Metric::Temperature.index()].in_alert(),
            humidity: self.monitors[Metric::Humidity.index()].in_alert(),
            noise: self.monitors[Metric::Noise.index()].in_alert(),
        }
    }

    /// Ventilation is wanted while any air-side metric is in alert.
    pub fn fan_demand(&self) -> bool {
        let flags = self.alert_flags();
        flags.co2 || flags.temperature || flags.humidity
    }

    /// The light relay closes while the room is too dark.
    pub fn light_demand(&self) -> bool {
        self.alert_flags().light
    }

    pub fn buzzer_demand(&self) -> bool {
        self.alert_flags().noise
    }

    /// Build the telemetry payload. The timestamp is the time of the most
    /// recent reading, falling back to `now` before anything was sampled.
    pub fn snapshot(&self, now: DateTime<Utc>) -> TelemetryReport {
        let flags = self.alert_flags();
        let score = telemetry::class_score(&flags);

        TelemetryReport {
            device_id: self.device_id.clone(),
            temperature: self.latest[Metric::Temperature.index()],
            humidity: self.latest[Metric::Humidity.index()],
            co2: self.latest[Metric::Co2.index()],
            light: self.latest[Metric::Lux.index()],
            noise: self.latest[Metric::Noise.index()],
            aqi: self.latest[Metric::Co2.index()].map(telemetry::aqi_from_co2),
            class_score: score,
            status: telemetry::status_label(score),
            timestamp: self.last_sample_at.unwrap_or(now),
        }
    }
}
