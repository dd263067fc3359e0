use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::engine::AlertFlags;

/// Snapshot published to the sensors topic. Field names match what the
/// dashboard backend ingests; metrics that have not produced a reading yet
/// serialize as `null`.
#[derive(Debug, Clone, Serialize)]
pub struct TelemetryReport {
    pub device_id: String,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub co2: Option<f64>,
    pub light: Option<f64>,
    pub noise: Option<f64>,
    pub aqi: Option<f64>,
    pub class_score: u8,
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// Air-quality index derived from CO2 concentration, piecewise linear over
/// the usual indoor bands: up to 600 ppm maps onto 0-50, 600-1000 onto
/// 50-100, 1000-2000 onto 100-200, and everything above onto 200-500.
pub fn aqi_from_co2(ppm: f64) -> f64 {
    const BANDS: [(f64, f64, f64, f64); 4] = [
        (0.0, 600.0, 0.0, 50.0),
        (600.0, 1000.0, 50.0, 100.0),
        (1000.0, 2000.0, 100.0, 200.0),
        (2000.0, 5000.0, 200.0, 500.0),
    ];

    let ppm = ppm.max(0.0);
    for (lo, hi, aqi_lo, aqi_hi) in BANDS {
        if ppm <= hi {
            return (aqi_lo + (ppm - lo) / (hi - lo) * (aqi_hi - aqi_lo)).round();
        }
    }
    500.0
}

/// Classroom comfort score: starts at 100 and loses a fixed amount per
/// metric currently in alert.
pub fn class_score(flags: &AlertFlags) -> u8 {
    let mut penalty: u8 = 0;
    if flags.co2 {
        penalty += 30;
    }
    if flags.noise {
        penalty += 25;
    }
    if flags.temperature {
        penalty += 20;
    }
    if flags.humidity {
        penalty += 15;
    }
    if flags.light {
        penalty += 10;
    }
    100u8.saturating_sub(penalty)
}

pub fn status_label(score: u8) -> &'static str {
    match score {
        80..=100 => "Good",
        50..=79 => "Fair",
        _ => "Poor",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aqi_band_edges() {
        assert_eq!(aqi_from_co2(0.0), 0.0);
        assert_eq!(aqi_from_co2(600.0), 50.0);
        assert_eq!(aqi_from_co2(800.0), 75.0);
        assert_eq!(aqi_from_co2(1000.0), 100.0);
        assert_eq!(aqi_from_co2(1500.0), 150.0);
        assert_eq!(aqi_from_co2(2000.0), 200.0);
        assert_eq!(aqi_from_co2(3500.0), 350.0);
        assert_eq!(aqi_from_co2(9000.0), 500.0);
    }

    #[test]
    fn aqi_never_negative() {
        assert_eq!(aqi_from_co2(-50.0), 0.0);
    }

    #[test]
    fn score_is_perfect_when_nothing_alerts() {
        assert_eq!(class_score(&AlertFlags::default()), 100);
    }

    #[test]
    fn score_deductions_accumulate() {
        let mut flags = AlertFlags::default();
        flags.co2 = true;
        assert_eq!(class_score(&flags), 70);
        flags.noise = true;
        assert_eq!(class_score(&flags), 45);
        flags.temperature = true;
        flags.humidity = true;
        flags.light = true;
        assert_eq!(class_score(&flags), 0);
    }

    #[test]
    fn status_bands() {
        assert_eq!(status_label(100), "Good");
        assert_eq!(status_label(80), "Good");
        assert_eq!(status_label(79), "Fair");
        assert_eq!(status_label(50), "Fair");
        assert_eq!(status_label(49), "Poor");
        assert_eq!(status_label(0), "Poor");
    }

    #[test]
    fn report_serializes_missing_metrics_as_null() {
        let report = TelemetryReport {
            device_id: "A101".to_string(),
            temperature: Some(24.5),
            humidity: None,
            co2: None,
            light: None,
            noise: None,
            aqi: None,
            class_score: 100,
            status: "Good",
            timestamp: chrono::DateTime::parse_from_rfc3339("2025-09-01T08:30:00Z")
                .unwrap()
                .with_timezone(&Utc),
        };
        let json: serde_json::Value = serde_json::to_value(&report).unwrap();
        assert_eq!(json["device_id"], "A101");
        assert_eq!(json["temperature"], 24.5);
        assert!(json["humidity"].is_null());
        assert_eq!(json["class_score"], 100);
        assert_eq!(json["status"], "Good");
        assert_eq!(json["timestamp"], "2025-09-01T08:30:00Z");
    }
}
