//! Observer notifications emitted by the pipeline.
//!
//! Events are broadcast; a host UI or status reporter subscribes through
//! the session handle. Lagging or absent subscribers never slow the
//! pipeline down.

use serde::Serialize;
use tokio::sync::broadcast;

use super::Phase;

/// Something observable happened in the session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// The detector queued a new id.
    Detected { image_id: i64, queue_depth: usize },

    /// The consumer picked an id up.
    Started { image_id: i64 },

    /// All artifacts for an image were written.
    Processed {
        image_id: i64,
        sequence: u64,
        display_name: String,
        width: u32,
        height: u32,
        total_pixels: usize,
        queue_depth: usize,
    },

    /// An image was dropped.
    Failed {
        image_id: i64,
        phase: Phase,
        error: String,
    },

    /// The registry accepted a constellation.
    Registered { image_id: i64 },

    /// The registry call failed; informational only.
    RegistrationFailed { image_id: i64, error: String },

    /// The consumer loop exited.
    Stopped,
}

/// Send an event, ignoring the no-subscriber case.
pub(crate) fn emit(tx: &broadcast::Sender<PipelineEvent>, event: PipelineEvent) {
    let _ = tx.send(event);
}
