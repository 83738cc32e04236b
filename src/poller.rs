//! Background polling of every registered sensor.

use crate::config::PollerConfig;
use crate::sensors::{RoundSummary, SensorRegistry};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// One perpetual loop that refreshes all sensors once per interval.
///
/// Rounds run on the blocking thread pool because the measurement loops
/// busy-wait on pins.
pub struct Poller {
    round: Round,
    sensors: usize,
    interval: Duration,
    backoff: Duration,
    rounds: Arc<AtomicU64>,
}

/// Handle to a running [`Poller`].
pub struct PollerHandle {
    shutdown: watch::Sender<bool>,
    rounds: Arc<AtomicU64>,
    task: JoinHandle<()>,
}

/// One pass over the sensors, run on a blocking thread.
type Round = Arc<dyn Fn() -> RoundSummary + Send + Sync>;

impl Poller {
    pub fn new(registry: Arc<SensorRegistry>, config: &PollerConfig) -> Self {
        let sensors = registry.len();
        Self::with_round(Arc::new(move || registry.update_all()), sensors, config)
    }

    pub(crate) fn with_round(round: Round, sensors: usize, config: &PollerConfig) -> Self {
        Self {
            round,
            sensors,
            interval: config.interval(),
            backoff: config.backoff(),
            rounds: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Start polling on the current tokio runtime.
    pub fn spawn(self) -> PollerHandle {
        let (shutdown, signal) = watch::channel(false);
        let rounds = self.rounds.clone();
        let task = tokio::spawn(self.run(signal));
        PollerHandle {
            shutdown,
            rounds,
            task,
        }
    }

    /// Poll until `shutdown` turns true or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Polling {} sensors every {}ms",
            self.sensors,
            self.interval.as_millis()
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let round = self.round.clone();
            let pause = match tokio::task::spawn_blocking(move || round()).await {
                Ok(summary) => {
                    self.rounds.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        "Polling round: {} sampled, {} without reading, {} panicked",
                        summary.sampled, summary.no_reading, summary.panicked
                    );
                    self.interval
                }
                Err(e) => {
                    error!("Error in continuous reading: {}", e);
                    self.backoff
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("Sensor polling stopped");
    }
}

impl PollerHandle {
    /// Completed polling rounds so far.
    pub fn rounds(&self) -> u64 {
        self.rounds.load(Ordering::Relaxed)
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signal the loop to stop and wait for the in-flight round to finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            error!("Poller task ended abnormally: {}", e);
        }
    }
}
