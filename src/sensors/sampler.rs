use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::bus::SensorBus;
use super::{Metric, Sample};

/// Polls one metric on a fixed interval and feeds readings to the engine.
pub struct Sampler {
    metric: Metric,
    pin: u8,
    interval: Duration,
    bus: Arc<dyn SensorBus>,
}

impl Sampler {
    pub fn new(metric: Metric, pin: u8, interval: Duration, bus: Arc<dyn SensorBus>) -> Self {
        Self {
            metric,
            pin,
            interval,
            bus,
        }
    }

    /// Main sampling loop. Reads until the bus fails, then backs off and
    /// starts over.
    pub async fn run(self, tx: mpsc::Sender<Sample>) {
        let mut backoff = Duration::from_secs(5);
        let max_backoff = Duration::from_secs(60);

        info!(
            "Sampling {} ({}) on pin {} every {:?}",
            self.metric.name(),
            self.metric.unit(),
            self.pin,
            self.interval,
        );

        loop {
            match self.run_session(&tx).await {
                Ok(()) => return,
                Err(e) => {
                    error!(
                        "{} sampler error: {}. Restarting in {:?}",
                        self.metric.name(),
                        e,
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(max_backoff);
                }
            }
        }
    }

    /// Runs until a read fails or the sample channel closes. A closed
    /// channel means the agent is shutting down; that ends the loop cleanly.
    async fn run_session(&self, tx: &mpsc::Sender<Sample>) -> Result<(), String> {
        let mut timer = tokio::time::interval(self.interval);

        loop {
            timer.tick().await;

            let value = self
                .bus
                .read(self.metric)
                .map_err(|e| format!("read failed on pin {}: {e}", self.pin))?;

            debug!("{} = {:.1} {}", self.metric.name(), value, self.metric.unit());

            let sample = Sample {
                metric: self.metric,
                value,
                taken_at: Utc::now(),
            };
            if tx.send(sample).await.is_err() {
                return Ok(());
            }
        }
    }
}
