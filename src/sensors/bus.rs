use std::f64::consts::TAU;
use std::sync::atomic::{AtomicU64, Ordering};

use super::Metric;

/// Hardware seam for sensor reads. Implementations cover the wiring in
/// `PinConfig`; the agent only ever asks for a calibrated value per metric,
/// never for raw ADC counts or bus transactions.
pub trait SensorBus: Send + Sync {
    fn read(&self, metric: Metric) -> Result<f64, String>;
}

/// Deterministic stand-in for the classroom hardware. Each metric follows a
/// slow sinusoidal drift with a small hashed ripple on top, advanced by one
/// tick per read, so a given read sequence always yields the same values.
pub struct SimulatedBus {
    ticks: [AtomicU64; 5],
}

impl SimulatedBus {
    pub fn new() -> Self {
        Self {
            ticks: Default::default(),
        }
    }

    fn waveform(metric: Metric, tick: u64) -> f64 {
        // (baseline, swing, period in ticks, ripple)
        let (base, swing, period, ripple) = match metric {
            Metric::Co2 => (650.0, 250.0, 180.0, 15.0),
            Metric::Lux => (420.0, 180.0, 240.0, 12.0),
            Metric::Temperature => (26.0, 6.0, 300.0, 0.4),
            Metric::Humidity => (60.0, 15.0, 270.0, 1.0),
            Metric::Noise => (52.0, 14.0, 90.0, 2.5),
        };
        let drift = swing * (TAU * tick as f64 / period).sin();
        let noise = ripple * (hash_unit(metric, tick) * 2.0 - 1.0);
        (base + drift + noise).max(0.0)
    }
}

impl Default for SimulatedBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorBus for SimulatedBus {
    fn read(&self, metric: Metric) -> Result<f64, String> {
        let tick = self.ticks[metric.index()].fetch_add(1, Ordering::Relaxed);
        Ok(Self::waveform(metric, tick))
    }
}

/// Deterministic pseudo-random value in [0, 1) from the metric and tick.
fn hash_unit(metric: Metric, tick: u64) -> f64 {
    let mut h = tick
        .wrapping_add(metric.index() as u64 + 1)
        .wrapping_mul(0x9E37_79B9_7F4A_7C15);
    h ^= h >> 32;
    h = h.wrapping_mul(0xD6E8_FEB8_6659_FD93);
    h ^= h >> 32;
    (h >> 11) as f64 / (1u64 << 53) as f64
}
