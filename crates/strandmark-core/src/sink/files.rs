//! Filesystem artifact sink.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{PipelineError, PipelineResult};
use crate::types::ProcessedImage;

use super::render;
use super::{ArtifactSink, PersistedArtifacts};

/// Writes every artifact into one output directory.
#[derive(Debug, Clone)]
pub struct FileSink {
    output_dir: PathBuf,
}

impl FileSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path of the append-only session log.
    pub fn master_log_path(&self) -> PathBuf {
        self.output_dir.join(render::MASTER_LOG)
    }

    async fn write(path: &Path, contents: &str) -> PipelineResult<()> {
        tokio::fs::write(path, contents)
            .await
            .map_err(|e| persistence(path, e))
    }

    async fn append(path: &Path, line: &str) -> PipelineResult<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| persistence(path, e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| persistence(path, e))?;
        file.flush().await.map_err(|e| persistence(path, e))
    }
}

fn persistence(path: &Path, e: std::io::Error) -> PipelineError {
    PipelineError::Persistence {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

#[async_trait]
impl ArtifactSink for FileSink {
    async fn persist(&self, image: &ProcessedImage) -> PipelineResult<PersistedArtifacts> {
        let id = image.record.id;
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| persistence(&self.output_dir, e))?;

        let strands_path = self.output_dir.join(render::strands_file_name(id));
        Self::write(&strands_path, &render::render_strand_file(image)).await?;
        tracing::debug!(image_id = id, "Wrote {:?}", strands_path);

        let metadata_path = self.output_dir.join(render::metadata_file_name(id));
        Self::write(&metadata_path, &render::render_metadata(image)).await?;

        Self::append(&self.master_log_path(), &render::master_log_line(image)).await?;

        let constellation_path = self.output_dir.join(render::constellation_file_name(id));
        Self::write(&constellation_path, &image.constellation.to_json()).await?;
        tracing::debug!(image_id = id, "Wrote {:?}", constellation_path);

        Ok(PersistedArtifacts {
            strands_path,
            metadata_path,
            constellation_path,
        })
    }
}
