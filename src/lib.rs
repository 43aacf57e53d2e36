//! A live view of resource leases and the policies that limit them.
//!
//! Lease and policy snapshots arrive over a server-sent event stream, possibly
//! out of order and possibly partial. [`LeaseView`] reconciles them into rows
//! keyed by identity and emits add/update/remove instructions to a
//! [`ViewSink`]. A [`ClockTicker`] ages leases out from locally tracked
//! deadlines, with or without further events.

use std::sync::Arc;

use futures::Stream;
use tokio::{
    sync::{Mutex, Notify},
    task::JoinHandle,
};
use tracing::info;

pub mod config;
pub mod diff;
pub mod error;
pub mod interface;
pub mod lease;
pub mod policy;
pub mod ticker;
pub mod transport;
pub mod util;
pub mod view;
pub mod worker;

pub use config::MonitorConfig;
pub use diff::{Diff, Row};
pub use error::{RecordKind, Result, ViewError};
pub use interface::{
    mirror::RenderedTable,
    record::{LeasesEvent, PoliciesEvent, TransportEvent},
    sink::{Cell, ConnectionStatus, Instruction, Table, ViewSink},
};
pub use lease::{LeaseReconciler, LeaseRow, LeaseStatus, RevisionGate};
pub use policy::{PolicyReconciler, PolicyRow, Strategy};
pub use ticker::ClockTicker;
pub use transport::{decode_stream, SseFrame, TransportSignal};
pub use util::{Clock, ManualClock, SystemClock};
pub use view::LeaseView;
pub use worker::ViewWorker;

use util::runnable::run_at_fixed_interval;

/// Owns a view, the sink it renders to and the ticker that ages it.
pub struct LeaseMonitor {
    config: MonitorConfig,
    view: Arc<Mutex<LeaseView>>,
    sink: Arc<dyn ViewSink>,
    clock: Arc<dyn Clock>,
    shutdown: Arc<Notify>,
    ticker: Option<JoinHandle<()>>,
}

impl LeaseMonitor {
    pub fn new(config: MonitorConfig, sink: Arc<dyn ViewSink>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            view: Arc::new(Mutex::new(LeaseView::new())),
            sink,
            clock: Arc::new(SystemClock),
            shutdown: Arc::new(Notify::new()),
            ticker: None,
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn view(&self) -> Arc<Mutex<LeaseView>> {
        self.view.clone()
    }

    pub fn worker(&self) -> ViewWorker {
        ViewWorker::new(self.view.clone(), self.sink.clone(), self.clock.clone())
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_some()
    }

    /// Spawns the clock ticker. Must be called from within a tokio runtime.
    pub fn start(&mut self) {
        if self.ticker.is_some() {
            return;
        }
        let ticker = Arc::new(ClockTicker::new(
            self.view.clone(),
            self.sink.clone(),
            self.clock.clone(),
        ));
        self.ticker = Some(tokio::spawn(run_at_fixed_interval(
            ticker,
            self.config.tick_interval,
            self.shutdown.clone(),
        )));
        info!(interval = ?self.config.tick_interval, "clock ticker started");
    }

    /// Processes transport signals until the stream ends.
    pub async fn run<S>(&self, signals: S)
    where
        S: Stream<Item = TransportSignal>,
    {
        self.worker().run(signals).await;
    }

    /// Replays the whole view into `sink`, e.g. a freshly created one.
    pub async fn rebuild(&self, sink: &dyn ViewSink) {
        let view = self.view.lock().await;
        for instruction in view.snapshot() {
            sink.apply(instruction).await;
        }
        sink.refresh_relative_labels(self.clock.now()).await;
    }

    /// Stops the ticker and waits for it to finish.
    pub async fn shutdown(&mut self) {
        if let Some(task) = self.ticker.take() {
            self.shutdown.notify_one();
            let _ = task.await;
        }
    }
}

impl Drop for LeaseMonitor {
    fn drop(&mut self) {
        if let Some(task) = self.ticker.take() {
            task.abort();
        }
    }
}
