//! Background task that reconciles orphaned pending reservations.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;
use tracing::{error, info, trace};

use crate::quota::{QuotaEngine, SweepReport};

/// Periodically runs [`QuotaEngine::reconcile_pending`].
#[derive(Debug)]
pub struct PendingReservationSweeper {
    engine: Arc<QuotaEngine>,
    interval: Duration,
}

impl PendingReservationSweeper {
    /// Sweep every `sweep_interval_seconds` from the engine configuration.
    pub fn new(engine: Arc<QuotaEngine>) -> Self {
        let interval = Duration::from_secs(engine.config().sweep_interval_seconds.max(1));
        Self { engine, interval }
    }

    /// Override the sweep interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run one pass.
    pub async fn sweep_once(&self) -> Option<SweepReport> {
        match self.engine.reconcile_pending().await {
            Ok(report) => {
                trace!(?report, "Pending sweep finished");
                Some(report)
            }
            Err(e) => {
                error!(error = %e, "Pending sweep failed");
                None
            }
        }
    }

    /// Sweep until the cancel signal turns `true`.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Pending reservation sweeper started"
        );

        let mut interval = time::interval(self.interval);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.sweep_once().await;
                }
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        info!("Pending reservation sweeper shutting down");
                        break;
                    }
                }
            }
        }
    }
}
