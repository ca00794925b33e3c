//! Change detection: notices in, newly seen ids out.
//!
//! Hosts report "something changed" through a [`ChangeNotifier`]; the
//! notice carries no detail because store notifications are coarse and may
//! arrive before the new row is committed. The detector waits a settle
//! delay, re-queries the store's maximum id, and enqueues it if it is newer
//! than anything seen this session.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use crate::error::PipelineResult;
use crate::source::ChangeSource;

use super::events::{emit, PipelineEvent};
use super::queue::IngestQueue;
use super::state::PipelineState;

/// Non-blocking handle for reporting store changes.
#[derive(Clone)]
pub struct ChangeNotifier {
    tx: mpsc::Sender<()>,
}

impl ChangeNotifier {
    /// Report a change. Never blocks; a notice that arrives while another is
    /// pending is folded into it.
    ///
    /// Returns `false` once the detector has stopped.
    pub fn notify(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) | Err(mpsc::error::TrySendError::Full(())) => true,
            Err(mpsc::error::TrySendError::Closed(())) => false,
        }
    }

    /// Whether the detector is still listening.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Create a notifier and the receiver the detector consumes.
pub fn change_channel() -> (ChangeNotifier, mpsc::Receiver<()>) {
    let (tx, rx) = mpsc::channel(1);
    (ChangeNotifier { tx }, rx)
}

/// Re-queries the source on every notice and feeds the queue.
pub struct ChangeDetector {
    source: Arc<dyn ChangeSource>,
    queue: IngestQueue,
    state: Arc<PipelineState>,
    events: broadcast::Sender<PipelineEvent>,
    settle_delay: Duration,
}

impl ChangeDetector {
    pub fn new(
        source: Arc<dyn ChangeSource>,
        queue: IngestQueue,
        state: Arc<PipelineState>,
        events: broadcast::Sender<PipelineEvent>,
        settle_delay: Duration,
    ) -> Self {
        Self {
            source,
            queue,
            state,
            events,
            settle_delay,
        }
    }

    /// Sync `last_seen_id` to the store's current maximum so images that
    /// already exist are never processed.
    pub async fn seed(&self) -> PipelineResult<Option<i64>> {
        let max = self.source.max_id().await?;
        if let Some(max) = max {
            self.state.reset_last_seen(max);
            tracing::debug!("Initialized with last image ID: {}", max);
        }
        Ok(max)
    }

    /// One detection cycle without the settle delay.
    ///
    /// Returns the id that was enqueued, if any.
    pub async fn check(&self) -> PipelineResult<Option<i64>> {
        let Some(max) = self.source.max_id().await? else {
            return Ok(None);
        };
        if !self.state.observe(max) {
            return Ok(None);
        }

        tracing::info!(image_id = max, "New image detected");
        if self.queue.enqueue(max)? {
            emit(
                &self.events,
                PipelineEvent::Detected {
                    image_id: max,
                    queue_depth: self.queue.depth(),
                },
            );
            Ok(Some(max))
        } else {
            Ok(None)
        }
    }

    /// Consume notices until shutdown or until every notifier is dropped.
    pub async fn run(&self, mut notices: mpsc::Receiver<()>, mut shutdown: watch::Receiver<bool>) {
        tracing::debug!("Change detector started");
        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                notice = notices.recv() => {
                    if notice.is_none() {
                        break;
                    }
                }
            }

            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(self.settle_delay) => {}
            }
            // Notices that arrived while settling are covered by this query
            while notices.try_recv().is_ok() {}

            if let Err(e) = self.check().await {
                tracing::warn!(phase = %e.phase(), error = %e, "Detection cycle skipped");
            }
        }
        notices.close();
        tracing::debug!("Change detector stopped");
    }
}

/// Feed the notifier on a fixed interval, for stores without native change
/// notifications.
pub fn spawn_poller(
    notifier: ChangeNotifier,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {
                    if !notifier.notify() {
                        break;
                    }
                }
            }
        }
    })
}
