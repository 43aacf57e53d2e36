use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::{
    error::{Result, ViewError},
    interface::{record::TransportEvent, sink::ViewSink},
    transport::TransportSignal,
    util::Clock,
    view::LeaseView,
};

/// Feeds transport signals into the shared view, one at a time.
///
/// The view stays locked while its instructions reach the sink, so the sink
/// sees them in the same order the view produced them, even with the clock
/// ticker running alongside.
#[derive(Clone)]
pub struct ViewWorker {
    view: Arc<Mutex<LeaseView>>,
    sink: Arc<dyn ViewSink>,
    clock: Arc<dyn Clock>,
}

impl ViewWorker {
    pub fn new(view: Arc<Mutex<LeaseView>>, sink: Arc<dyn ViewSink>, clock: Arc<dyn Clock>) -> Self {
        Self { view, sink, clock }
    }

    /// Processes one signal. Rejected events come back as errors after the
    /// view has been left untouched. An interruption raises the banner and
    /// comes back as [`ViewError::TransportInterrupted`].
    pub async fn process(&self, signal: TransportSignal) -> Result<()> {
        match signal {
            TransportSignal::Frame(frame) => {
                let event = match TransportEvent::decode(&frame.event, &frame.data)? {
                    Some(event) => event,
                    None => {
                        debug!(event = %frame.event, "ignoring unhandled event type");
                        return Ok(());
                    }
                };
                let mut view = self.view.lock().await;
                let instructions = view.apply_event(&event, self.clock.now())?;
                debug!(
                    event = event.name(),
                    instructions = instructions.len(),
                    "event applied"
                );
                for instruction in instructions {
                    self.sink.apply(instruction).await;
                }
            }
            TransportSignal::Interrupted(reason) => {
                self.interrupt(reason.clone()).await;
                return Err(ViewError::TransportInterrupted(reason));
            }
        }
        Ok(())
    }

    /// Drains `signals` until it ends, then raises the connectivity banner.
    pub async fn run<S>(&self, signals: S)
    where
        S: Stream<Item = TransportSignal>,
    {
        futures::pin_mut!(signals);
        while let Some(signal) = signals.next().await {
            match self.process(signal).await {
                Ok(()) => {}
                Err(err) if err.is_stale() => debug!(error = %err, "discarding stale event"),
                Err(ViewError::TransportInterrupted(_)) => {}
                Err(err) => error!(error = %err, "rejected event"),
            }
        }
        self.interrupt("event stream closed".to_string()).await;
    }

    async fn interrupt(&self, reason: String) {
        let mut view = self.view.lock().await;
        let banner = view.transport_interrupted(reason);
        self.sink.apply(banner).await;
    }
}
