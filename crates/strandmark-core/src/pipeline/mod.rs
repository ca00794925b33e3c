//! Image ingestion pipeline components.
//!
//! This module contains every stage between a change notice and persisted
//! artifacts:
//! - **queue**: Monotonic, single-consumer FIFO of pending image ids
//! - **detector**: Turns change notices into enqueued ids after a settle delay
//! - **decode**: Pixel sources (bounds probe and full decode)
//! - **pixels**: The owned RGB buffer both extractors read
//! - **strands**: Three-column strand sampling
//! - **constellation**: Brightest-point grid signature
//! - **processor**: Single-flight orchestration of one image at a time
//! - **events**: Observer notifications

pub mod constellation;
pub mod decode;
pub mod detector;
pub mod events;
pub mod pixels;
pub mod processor;
pub mod queue;
pub mod state;
pub mod strands;

use serde::{Deserialize, Serialize};

// Re-exports for convenient access
pub use constellation::ConstellationExtractor;
pub use decode::{ImageDecoder, PixelSource};
pub use detector::{spawn_poller, ChangeDetector, ChangeNotifier};
pub use events::PipelineEvent;
pub use pixels::PixelBuffer;
pub use processor::{Collaborators, ExtractionPipeline};
pub use queue::{ingest_queue, IngestQueue, QueueReceiver};
pub use state::PipelineState;
pub use strands::StrandExtractor;

/// Stage of work, used to tag log records and failure events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Detecting,
    Querying,
    Decoding,
    ExtractingStrands,
    ExtractingConstellation,
    Persisting,
    Notifying,
    Registering,
    Done,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Detecting => "detecting",
            Phase::Querying => "querying",
            Phase::Decoding => "decoding",
            Phase::ExtractingStrands => "extracting_strands",
            Phase::ExtractingConstellation => "extracting_constellation",
            Phase::Persisting => "persisting",
            Phase::Notifying => "notifying",
            Phase::Registering => "registering",
            Phase::Done => "done",
        };
        f.write_str(name)
    }
}
