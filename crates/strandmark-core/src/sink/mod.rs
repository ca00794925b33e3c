//! Artifact sinks: where processed images end up.
//!
//! - **files**: the on-disk artifact set (`pixel_strands_<N>.txt`,
//!   `metadata_<N>.txt`, `constellation_<N>.json`, `master_log.txt`)
//! - **registry**: the optional remote constellation registry
//! - **render**: the fixed text layouts shared by both

mod files;
pub mod registry;
pub mod render;

pub use files::FileSink;
pub use registry::{HttpRegistrar, Registrar, RegistrationPayload};

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::PipelineResult;
use crate::types::ProcessedImage;

/// Paths of the per-image artifacts written by a sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistedArtifacts {
    pub strands_path: PathBuf,
    pub metadata_path: PathBuf,
    pub constellation_path: PathBuf,
}

/// Durable storage for processed images.
///
/// A failure part-way leaves whatever was already written in place; the
/// pipeline drops the image and moves on.
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    async fn persist(&self, image: &ProcessedImage) -> PipelineResult<PersistedArtifacts>;
}
