//! A running watch session: detector, queue and consumer wired together.
//!
//! ```text
//! ChangeNotifier ──► ChangeDetector ──► IngestQueue ──► ExtractionPipeline
//!   (host)             (1 task)                           (1 task)
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::error::{PipelineResult, Result};
use crate::pipeline::detector::change_channel;
use crate::pipeline::{
    ingest_queue, spawn_poller, ChangeDetector, ChangeNotifier, Collaborators,
    ExtractionPipeline, IngestQueue, PipelineEvent, PipelineState,
};
use crate::types::SessionStats;

/// Starts watch sessions.
pub struct WatchSession;

impl WatchSession {
    /// Seed from the source's current maximum id and start the detector and
    /// consumer tasks.
    ///
    /// Fails only on an invalid config. A source that cannot be queried at
    /// startup is not fatal: the session starts with no id seen and the next
    /// successful detection catches up.
    pub async fn start(config: &Config, collaborators: Collaborators) -> Result<SessionHandle> {
        config.validate()?;

        let state = Arc::new(PipelineState::new());
        let (events, _) = broadcast::channel(config.pipeline.event_buffer);
        let (queue, receiver) = ingest_queue(config.pipeline.max_queue_depth);
        let (notifier, notices) = change_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let detector = Arc::new(ChangeDetector::new(
            collaborators.source.clone(),
            queue.clone(),
            state.clone(),
            events.clone(),
            Duration::from_millis(config.watch.settle_delay_ms),
        ));
        if let Err(e) = detector.seed().await {
            tracing::warn!(phase = %e.phase(), error = %e, "Could not seed last seen id");
        }

        let pipeline = ExtractionPipeline::new(config, collaborators, state.clone(), events.clone());

        let detector_task = tokio::spawn({
            let detector = detector.clone();
            let shutdown = shutdown_rx.clone();
            async move { detector.run(notices, shutdown).await }
        });
        let consumer_task = tokio::spawn(pipeline.run(receiver, shutdown_rx));

        tracing::info!(last_seen_id = state.last_seen_id(), "Watch session started");

        Ok(SessionHandle {
            notifier,
            detector,
            queue,
            state,
            events,
            shutdown: shutdown_tx,
            tasks: vec![detector_task, consumer_task],
        })
    }
}

/// Control handle for a running session.
pub struct SessionHandle {
    notifier: ChangeNotifier,
    detector: Arc<ChangeDetector>,
    queue: IngestQueue,
    state: Arc<PipelineState>,
    events: broadcast::Sender<PipelineEvent>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl SessionHandle {
    /// Handle for reporting store changes; cheap to clone.
    pub fn notifier(&self) -> ChangeNotifier {
        self.notifier.clone()
    }

    /// Subscribe to pipeline events.
    pub fn events(&self) -> broadcast::Receiver<PipelineEvent> {
        self.events.subscribe()
    }

    pub fn stats(&self) -> SessionStats {
        self.state.snapshot(self.queue.depth())
    }

    /// Re-sync `last_seen_id` to the source, e.g. after the host was
    /// suspended. Images added while suspended are skipped.
    pub async fn resume(&self) -> PipelineResult<Option<i64>> {
        self.detector.seed().await
    }

    /// Poll the source on a fixed interval in addition to host notices.
    pub fn enable_polling(&mut self, interval: Duration) {
        let task = spawn_poller(self.notifier.clone(), interval, self.shutdown.subscribe());
        self.tasks.push(task);
    }

    /// Stop detection and let the consumer finish the image in flight.
    pub async fn shutdown(self) -> SessionStats {
        tracing::info!("Shutting down watch session");
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::error!("Session task panicked: {}", e);
            }
        }
        let stats = self.state.snapshot(self.queue.depth());
        tracing::info!(
            processed = stats.processed,
            persisted = stats.persisted,
            failed = stats.failed,
            "Watch session stopped"
        );
        stats
    }
}
