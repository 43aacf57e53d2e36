use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::{sync::Notify, time::MissedTickBehavior};

/// Runs `runnable` once per `interval` until `shutdown` is notified.
///
/// The first run happens immediately. Ticks missed while a run is in progress
/// are not replayed in a burst. Signal shutdown with `Notify::notify_one` so
/// the request is kept even when it lands between two runs.
pub(crate) async fn run_at_fixed_interval<T: PeriodicRunnable + ?Sized>(
    runnable: Arc<T>,
    interval: Duration,
    shutdown: Arc<Notify>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = shutdown.notified() => break,
            _ = ticker.tick() => runnable.run_once().await,
        }
    }

    runnable.before_shutdown_complete().await;
}

#[async_trait]
pub(crate) trait PeriodicRunnable: Send + Sync {
    async fn run_once(&self);
    async fn before_shutdown_complete(&self) {}
}
