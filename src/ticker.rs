use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{
    interface::sink::ViewSink, util::runnable::PeriodicRunnable, util::Clock, view::LeaseView,
};

/// Ages the view on a fixed period, independently of the transport.
///
/// Every tick removes leases whose death instant has passed and asks the sink
/// to refresh its relative-time labels. This is the only way a released lease
/// leaves the view once no further events arrive for its resource.
pub struct ClockTicker {
    view: Arc<Mutex<LeaseView>>,
    sink: Arc<dyn ViewSink>,
    clock: Arc<dyn Clock>,
}

impl ClockTicker {
    pub fn new(view: Arc<Mutex<LeaseView>>, sink: Arc<dyn ViewSink>, clock: Arc<dyn Clock>) -> Self {
        Self { view, sink, clock }
    }

    pub async fn tick(&self) {
        let mut view = self.view.lock().await;
        let now = self.clock.now();
        let instructions = view.tick(now);
        if instructions.len() > 1 {
            debug!(expired = instructions.len() - 1, "swept dead leases");
        }
        for instruction in instructions {
            self.sink.apply(instruction).await;
        }
    }
}

#[async_trait]
impl PeriodicRunnable for ClockTicker {
    async fn run_once(&self) {
        self.tick().await;
    }

    async fn before_shutdown_complete(&self) {
        info!("clock ticker stopped");
    }
}
