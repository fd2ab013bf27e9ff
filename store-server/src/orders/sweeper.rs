//! Expiry sweeper
//!
//! Periodic background task that finalizes cancellation of expired pending
//! orders. The deadline on an order is advisory data; this task is what
//! actually cancels, so the window an order can stay pending past its
//! deadline is bounded by the sweep interval. The same engine entry point
//! also backs the admin-triggered sweep endpoint.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::utils::time::now_ms;

use super::engine::ReservationEngine;

/// Periodic expiry sweeper
///
/// Registered as a `TaskKind::Periodic` background task at server startup.
pub struct ExpirySweeper {
    engine: Arc<ReservationEngine>,
    interval: Duration,
    shutdown: CancellationToken,
}

impl ExpirySweeper {
    pub fn new(
        engine: Arc<ReservationEngine>,
        interval_secs: u64,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            engine,
            interval: Duration::from_secs(interval_secs),
            shutdown,
        }
    }

    /// Main loop: sweep once per interval until shutdown.
    pub async fn run(self) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "Expiry sweeper started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    match self.engine.sweep_expired(now_ms()).await {
                        Ok(0) => {}
                        Ok(count) => {
                            tracing::info!(count, "Sweep cancelled expired orders");
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Expiry sweep failed");
                        }
                    }
                }
            }
        }

        tracing::info!("Expiry sweeper stopped");
    }
}
