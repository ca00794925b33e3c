//! Strandmark Core - provenance signatures for newly captured photos.
//!
//! Strandmark watches a photo store and, for every image added after the
//! session started, writes two content-derived signatures:
//!
//! - **strands**: three vertical pixel columns sampled at fixed positions
//! - **constellation**: the brightest point of every cell in an N×N grid
//!
//! # Architecture
//!
//! ```text
//! notice → settle → max id → IngestQueue → query → decode → strands
//!                                                       → constellation → persist → register
//! ```
//!
//! Exactly one image is processed at a time. The store, the pixel decoder,
//! the artifact sink and the registry are all traits so hosts can plug in
//! their own.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use strandmark_core::{Collaborators, Config, DirectorySource, FileSink, ImageDecoder, WatchSession};
//!
//! #[tokio::main]
//! async fn main() -> strandmark_core::Result<()> {
//!     let config = Config::load()?;
//!     let collaborators = Collaborators {
//!         source: Arc::new(DirectorySource::new(config.source_dir(), &config.watch)),
//!         pixels: Arc::new(ImageDecoder::new(config.limits.clone())),
//!         sink: Arc::new(FileSink::new(config.output_dir())),
//!         registrar: None,
//!     };
//!
//!     let mut session = WatchSession::start(&config, collaborators).await?;
//!     session.enable_polling(std::time::Duration::from_secs(2));
//!     tokio::signal::ctrl_c().await?;
//!     let stats = session.shutdown().await;
//!     println!("Processed {} images", stats.processed);
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod error;
pub mod pipeline;
pub mod session;
pub mod sink;
pub mod source;
pub mod types;
pub mod verify;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenient access
pub use config::Config;
pub use error::{ConfigError, PipelineError, PipelineResult, Result, StrandmarkError, VerifyError};
pub use pipeline::{
    ChangeNotifier, Collaborators, ConstellationExtractor, ExtractionPipeline, ImageDecoder,
    Phase, PipelineEvent, PixelBuffer, PixelSource, StrandExtractor,
};
pub use session::{SessionHandle, WatchSession};
pub use sink::{ArtifactSink, FileSink, HttpRegistrar, Registrar};
pub use source::{ChangeSource, DirectorySource};
pub use types::{
    ConstellationCell, ConstellationSignature, ImageRecord, ProcessedImage, SessionStats,
    StrandBand, StrandSample, StrandSet,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
