//! Pipeline orchestration - drains the queue one image at a time.
//!
//! Per id the stages run strictly in order:
//!
//! ```text
//! query → decode → strands → constellation → persist → notify
//! ```
//!
//! A failure in any stage drops the image and the consumer moves on to the
//! next id after the pacing delay.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;
use tokio::sync::{broadcast, watch};

use crate::config::{Config, GeneralConfig};
use crate::error::{PipelineError, PipelineResult};
use crate::sink::render::format_timestamp;
use crate::sink::{ArtifactSink, Registrar, RegistrationPayload};
use crate::source::ChangeSource;
use crate::types::ProcessedImage;

use super::constellation::ConstellationExtractor;
use super::decode::PixelSource;
use super::events::{emit, PipelineEvent};
use super::queue::QueueReceiver;
use super::state::PipelineState;
use super::strands::StrandExtractor;
use super::Phase;

/// The external pieces a pipeline talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub source: Arc<dyn ChangeSource>,
    pub pixels: Arc<dyn PixelSource>,
    pub sink: Arc<dyn ArtifactSink>,

    /// Remote registry; `None` disables registration
    pub registrar: Option<Arc<dyn Registrar>>,
}

/// Single-consumer extraction pipeline.
pub struct ExtractionPipeline {
    collaborators: Collaborators,
    constellation: ConstellationExtractor,
    general: GeneralConfig,
    pace_delay: Duration,
    state: Arc<PipelineState>,
    events: broadcast::Sender<PipelineEvent>,
}

impl ExtractionPipeline {
    pub fn new(
        config: &Config,
        collaborators: Collaborators,
        state: Arc<PipelineState>,
        events: broadcast::Sender<PipelineEvent>,
    ) -> Self {
        Self {
            collaborators,
            constellation: ConstellationExtractor::new(config.constellation.grid_size),
            general: config.general.clone(),
            pace_delay: Duration::from_millis(config.pipeline.pace_delay_ms),
            state,
            events,
        }
    }

    /// Run every stage for one image and persist the result.
    ///
    /// Registration, if configured, is spawned off and not awaited.
    pub async fn process(&self, image_id: i64) -> PipelineResult<ProcessedImage> {
        let start = Instant::now();
        tracing::debug!(image_id, phase = %Phase::Querying, "Processing image");

        let record = self
            .collaborators
            .source
            .query_by_id(image_id)
            .await
            .map_err(|e| PipelineError::Query {
                image_id,
                message: e.to_string(),
            })?
            .ok_or(PipelineError::ImageNotFound(image_id))?;
        let sequence = self.state.next_sequence();
        let captured_at = format_timestamp(Local::now());

        // Decode
        tracing::debug!(image_id, phase = %Phase::Decoding, locator = %record.locator);
        let decode_start = Instant::now();
        let (mut width, mut height) = (record.width, record.height);
        if width == 0 || height == 0 {
            (width, height) = self.collaborators.pixels.probe(&record.locator).await?;
        }
        let buffer = Arc::new(self.collaborators.pixels.decode(&record.locator).await?);
        if width == 0 || height == 0 {
            (width, height) = buffer.dimensions();
        }
        tracing::trace!("  Decode: {:?}", decode_start.elapsed());

        // Both signatures are computed off the async runtime; the buffer is
        // released once the constellation step returns.
        tracing::debug!(image_id, phase = %Phase::ExtractingStrands, width, height);
        let extract_start = Instant::now();
        let strands = {
            let buffer = buffer.clone();
            tokio::task::spawn_blocking(move || StrandExtractor::extract(&buffer, width, height))
                .await
                .map_err(|e| extraction_error(image_id, Phase::ExtractingStrands, e))?
                .map_err(|e| extraction_error(image_id, Phase::ExtractingStrands, e))?
        };
        tracing::trace!("  Strands: {:?}", extract_start.elapsed());

        tracing::debug!(image_id, phase = %Phase::ExtractingConstellation);
        let constellation_start = Instant::now();
        let extractor = self.constellation;
        let signature = tokio::task::spawn_blocking(move || extractor.extract(&buffer))
            .await
            .map_err(|e| extraction_error(image_id, Phase::ExtractingConstellation, e))?;
        tracing::trace!("  Constellation: {:?}", constellation_start.elapsed());

        let image = ProcessedImage {
            record,
            sequence,
            captured_at,
            author: self.general.author.clone(),
            strands,
            constellation: signature,
        };

        // Persist
        tracing::debug!(image_id, phase = %Phase::Persisting);
        let persist_start = Instant::now();
        let artifacts = self.collaborators.sink.persist(&image).await?;
        self.state.record_persisted();
        tracing::trace!("  Persist: {:?}", persist_start.elapsed());

        tracing::debug!(image_id, phase = %Phase::Notifying);
        self.spawn_registration(&image);

        tracing::info!(
            image_id,
            sequence,
            phase = %Phase::Done,
            total_pixels = image.strands.total_samples(),
            "Processed {} ({}x{}) in {:?} -> {:?}",
            image.record.display_name,
            width,
            height,
            start.elapsed(),
            artifacts.strands_path
        );
        Ok(image)
    }

    /// Hand the constellation to the registrar on its own task.
    fn spawn_registration(&self, image: &ProcessedImage) {
        let Some(registrar) = self.collaborators.registrar.clone() else {
            return;
        };
        let image_id = image.record.id;
        let payload = match RegistrationPayload::new(image, &self.general) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(phase = %e.phase(), image_id, error = %e, "Registration skipped");
                return;
            }
        };

        let events = self.events.clone();
        tokio::spawn(async move {
            match registrar.register(&payload).await {
                Ok(()) => emit(&events, PipelineEvent::Registered { image_id }),
                Err(e) => {
                    tracing::warn!(phase = %e.phase(), image_id, error = %e, "Registration failed");
                    emit(
                        &events,
                        PipelineEvent::RegistrationFailed {
                            image_id,
                            error: e.to_string(),
                        },
                    );
                }
            }
        });
    }

    /// Drain the queue until shutdown or until every producer is gone.
    ///
    /// Shutdown interrupts a waiting dequeue and the pacing delay, never an
    /// image that is already being processed.
    pub async fn run(self, mut queue: QueueReceiver, mut shutdown: watch::Receiver<bool>) {
        tracing::debug!("Extraction pipeline started");
        while !*shutdown.borrow() {
            let image_id = tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                next = queue.dequeue() => match next {
                    Some(id) => id,
                    None => break,
                },
            };

            emit(&self.events, PipelineEvent::Started { image_id });
            match self.process(image_id).await {
                Ok(image) => emit(
                    &self.events,
                    PipelineEvent::Processed {
                        image_id,
                        sequence: image.sequence,
                        display_name: image.record.display_name,
                        width: image.strands.width,
                        height: image.strands.height,
                        total_pixels: image.strands.total_samples(),
                        queue_depth: queue.depth(),
                    },
                ),
                Err(e) => {
                    tracing::error!(phase = %e.phase(), image_id, error = %e, "Image dropped");
                    self.state.record_failure();
                    emit(
                        &self.events,
                        PipelineEvent::Failed {
                            image_id,
                            phase: e.phase(),
                            error: e.to_string(),
                        },
                    );
                }
            }

            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(self.pace_delay) => {}
            }
        }
        emit(&self.events, PipelineEvent::Stopped);
        tracing::debug!("Extraction pipeline stopped");
    }
}

fn extraction_error(image_id: i64, phase: Phase, cause: impl std::fmt::Display) -> PipelineError {
    PipelineError::Extraction {
        image_id,
        phase,
        message: cause.to_string(),
    }
}
