//! Error types for the Strandmark provenance pipeline.
//!
//! Errors are organized by stage so every failure can be logged with the
//! phase it happened in, the image it concerns, and a readable cause.

use std::path::PathBuf;
use thiserror::Error;

use crate::pipeline::Phase;

/// Top-level error type for Strandmark operations.
#[derive(Error, Debug)]
pub enum StrandmarkError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Stored artifacts could not be read back
    #[error("Verification error: {0}")]
    Verify(#[from] VerifyError),
}

/// Errors reading stored artifacts back for verification.
#[derive(Error, Debug)]
pub enum VerifyError {
    /// A pixel line did not match `X=..,Y=..,RGB(..),#RRGGBB`
    #[error("Malformed pixel line {line_no}: {line}")]
    MalformedPixel { line_no: usize, line: String },

    /// The file contains no strand sections
    #[error("No strand data found")]
    NoStrands,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Pipeline processing errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The change source could not be queried
    #[error("Source unavailable: {message}")]
    SourceUnavailable { message: String },

    /// Looking up one image's record failed
    #[error("Query for image {image_id} failed: {message}")]
    Query { image_id: i64, message: String },

    /// The source no longer knows the requested id
    #[error("Image {0} not found in source")]
    ImageNotFound(i64),

    /// Pixel decoding failed
    #[error("Decode error for {locator}: {message}")]
    Decode { locator: String, message: String },

    /// Unsupported image format
    #[error("Unsupported format for {locator}: {format}")]
    UnsupportedFormat { locator: String, format: String },

    /// Image dimensions exceed limit
    #[error("Image too large: {locator} ({width}x{height} > {max_dim})")]
    ImageTooLarge {
        locator: String,
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// Operation timed out
    #[error("Timeout in {stage} stage for {locator} after {timeout_ms}ms")]
    Timeout {
        locator: String,
        stage: String,
        timeout_ms: u64,
    },

    /// A signature could not be computed from the decoded buffer
    #[error("Extraction failed for image {image_id} while {phase}: {message}")]
    Extraction {
        image_id: i64,
        phase: Phase,
        message: String,
    },

    /// Writing an artifact failed
    #[error("Failed to write {path}: {message}")]
    Persistence { path: PathBuf, message: String },

    /// Remote registration failed
    #[error("Registration failed: {message}")]
    Remote {
        message: String,
        status_code: Option<u16>,
    },

    /// The queue reached its configured depth cap
    #[error("Ingest queue full ({depth} pending), dropping image {image_id}")]
    QueueFull { image_id: i64, depth: usize },

    /// The consumer side of the queue is gone
    #[error("Ingest queue closed")]
    QueueClosed,
}

impl PipelineError {
    /// The pipeline phase this error belongs to, for structured logging.
    pub fn phase(&self) -> Phase {
        match self {
            Self::SourceUnavailable { .. } | Self::QueueFull { .. } | Self::QueueClosed => {
                Phase::Detecting
            }
            Self::Query { .. } | Self::ImageNotFound(_) => Phase::Querying,
            Self::Decode { .. }
            | Self::UnsupportedFormat { .. }
            | Self::ImageTooLarge { .. }
            | Self::Timeout { .. } => Phase::Decoding,
            Self::Extraction { phase, .. } => *phase,
            Self::Persistence { .. } => Phase::Persisting,
            Self::Remote { .. } => Phase::Registering,
        }
    }
}

/// Convenience type alias for Strandmark results.
pub type Result<T> = std::result::Result<T, StrandmarkError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
