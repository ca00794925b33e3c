//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory where strand, metadata, and constellation files are written
    pub output_dir: PathBuf,

    /// Author recorded in every artifact and registration
    pub author: String,

    /// Device identifier sent with registrations
    pub device_model: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("~/.strandmark/provenance"),
            author: "agbuddy7".to_string(),
            device_model: format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH),
        }
    }
}

/// Change detection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Directory watched by the reference host
    pub source_dir: PathBuf,

    /// Descend into subdirectories
    pub recursive: bool,

    /// Interval between polling notices in milliseconds
    pub poll_interval_ms: u64,

    /// Pause between a change notice and the re-query, in milliseconds
    pub settle_delay_ms: u64,

    /// Supported input formats
    pub supported_formats: Vec<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("~/Pictures"),
            recursive: false,
            poll_interval_ms: 2000,
            settle_delay_ms: 800,
            supported_formats: vec![
                "jpg".to_string(),
                "jpeg".to_string(),
                "png".to_string(),
                "webp".to_string(),
                "bmp".to_string(),
                "tiff".to_string(),
                "gif".to_string(),
            ],
        }
    }
}

/// Pipeline pacing and queue settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Delay after each processed image before the next dequeue, in milliseconds
    pub pace_delay_ms: u64,

    /// Maximum pending ids; 0 means unbounded
    pub max_queue_depth: usize,

    /// Capacity of the observer event channel
    pub event_buffer: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            pace_delay_ms: 300,
            max_queue_depth: 0,
            event_buffer: 64,
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Decode timeout in milliseconds
    pub decode_timeout_ms: u64,

    /// Maximum image dimension (width or height)
    pub max_image_dimension: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            decode_timeout_ms: 10_000,
            max_image_dimension: 20_000,
        }
    }
}

/// Constellation signature settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstellationConfig {
    /// Number of grid cells per side
    pub grid_size: u32,
}

impl Default for ConstellationConfig {
    fn default() -> Self {
        Self { grid_size: 8 }
    }
}

/// Remote registration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    /// Send each constellation to the registry
    pub enabled: bool,

    /// Registry endpoint receiving the POST
    pub endpoint: String,

    /// Connect timeout in milliseconds
    pub connect_timeout_ms: u64,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "https://netra-1.onrender.com/register".to_string(),
            connect_timeout_ms: 10_000,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
