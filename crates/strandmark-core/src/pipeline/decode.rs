//! Pixel sources: bounds probing and full decoding with limits and timeout.

use async_trait::async_trait;
use image::ImageFormat;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::timeout;

use crate::config::LimitsConfig;
use crate::error::{PipelineError, PipelineResult};

use super::pixels::PixelBuffer;

/// Anything that can turn a locator into pixels.
///
/// Uses `async_trait` so the pipeline can hold an `Arc<dyn PixelSource>`.
#[async_trait]
pub trait PixelSource: Send + Sync {
    /// Read only the image bounds, without decoding pixel data.
    async fn probe(&self, locator: &str) -> PipelineResult<(u32, u32)>;

    /// Fully decode the image to an RGB buffer.
    async fn decode(&self, locator: &str) -> PipelineResult<PixelBuffer>;
}

/// Resolve a `file://` locator (or a bare path) to a filesystem path.
pub fn locator_to_path(locator: &str) -> PathBuf {
    PathBuf::from(locator.strip_prefix("file://").unwrap_or(locator))
}

/// Build a `file://` locator for a path.
pub fn path_to_locator(path: &Path) -> String {
    format!("file://{}", path.display())
}

/// Filesystem decoder backed by the `image` crate.
pub struct ImageDecoder {
    limits: LimitsConfig,
}

impl ImageDecoder {
    /// Create a new decoder with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Synchronous decode from bytes (runs in spawn_blocking).
    fn decode_bytes_sync(bytes: Vec<u8>, locator: &str) -> PipelineResult<PixelBuffer> {
        use std::io::Cursor;

        let mut reader = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| PipelineError::Decode {
                locator: locator.to_string(),
                message: format!("Cannot detect image format: {}", e),
            })?;

        // Content sniffing failed; fall back to the extension
        if reader.format().is_none() {
            let path = locator_to_path(locator);
            let format =
                ImageFormat::from_path(&path).map_err(|_| PipelineError::UnsupportedFormat {
                    locator: locator.to_string(),
                    format: path
                        .extension()
                        .and_then(|e| e.to_str())
                        .unwrap_or("unknown")
                        .to_string(),
                })?;
            reader.set_format(format);
        }

        let image = reader.decode().map_err(|e| PipelineError::Decode {
            locator: locator.to_string(),
            message: e.to_string(),
        })?;

        Ok(PixelBuffer::from_dynamic(image))
    }

    fn check_dimensions(&self, locator: &str, width: u32, height: u32) -> PipelineResult<()> {
        let max_dim = self.limits.max_image_dimension;
        if width > max_dim || height > max_dim {
            return Err(PipelineError::ImageTooLarge {
                locator: locator.to_string(),
                width,
                height,
                max_dim,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PixelSource for ImageDecoder {
    async fn probe(&self, locator: &str) -> PipelineResult<(u32, u32)> {
        let path = locator_to_path(locator);
        let locator_owned = locator.to_string();

        tokio::task::spawn_blocking(move || {
            image::ImageReader::open(&path)
                .and_then(|r| r.with_guessed_format())
                .map_err(|e| e.to_string())
                .and_then(|r| r.into_dimensions().map_err(|e| e.to_string()))
        })
        .await
        .map_err(|e| PipelineError::Decode {
            locator: locator_owned.clone(),
            message: format!("Task join error: {}", e),
        })?
        .map_err(|message| PipelineError::Decode {
            locator: locator_owned,
            message,
        })
    }

    async fn decode(&self, locator: &str) -> PipelineResult<PixelBuffer> {
        let path = locator_to_path(locator);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| PipelineError::Decode {
                locator: locator.to_string(),
                message: format!("Cannot read file: {}", e),
            })?;

        let locator_owned = locator.to_string();
        let timeout_duration = Duration::from_millis(self.limits.decode_timeout_ms);

        let decode_result = timeout(timeout_duration, async {
            tokio::task::spawn_blocking(move || Self::decode_bytes_sync(bytes, &locator_owned))
                .await
        })
        .await;

        match decode_result {
            Ok(Ok(Ok(buffer))) => {
                self.check_dimensions(locator, buffer.width(), buffer.height())?;
                Ok(buffer)
            }
            Ok(Ok(Err(e))) => Err(e),
            Ok(Err(e)) => Err(PipelineError::Decode {
                locator: locator.to_string(),
                message: format!("Task join error: {}", e),
            }),
            Err(_) => Err(PipelineError::Timeout {
                locator: locator.to_string(),
                stage: "decode".to_string(),
                timeout_ms: self.limits.decode_timeout_ms,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.join(name);
        image::RgbImage::from_fn(width, height, |x, y| image::Rgb([x as u8, y as u8, 200]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn test_locator_round_trip() {
        let path = Path::new("/photos/a b.jpg");
        let locator = path_to_locator(path);
        assert_eq!(locator, "file:///photos/a b.jpg");
        assert_eq!(locator_to_path(&locator), path);
        assert_eq!(locator_to_path("/plain/path.png"), Path::new("/plain/path.png"));
    }

    #[tokio::test]
    async fn test_probe_and_decode() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "img.png", 12, 7);
        let locator = path_to_locator(&path);
        let decoder = ImageDecoder::new(LimitsConfig::default());

        assert_eq!(decoder.probe(&locator).await.unwrap(), (12, 7));

        let buffer = decoder.decode(&locator).await.unwrap();
        assert_eq!(buffer.dimensions(), (12, 7));
        assert_eq!(buffer.get(3, 4), Some([3, 4, 200]));
    }

    #[tokio::test]
    async fn test_format_detected_by_content() {
        let dir = tempfile::tempdir().unwrap();
        let png = write_png(dir.path(), "img.png", 4, 4);
        let misnamed = dir.path().join("img.jpg");
        std::fs::copy(&png, &misnamed).unwrap();

        let decoder = ImageDecoder::new(LimitsConfig::default());
        let buffer = decoder.decode(&path_to_locator(&misnamed)).await.unwrap();
        assert_eq!(buffer.dimensions(), (4, 4));
    }

    #[tokio::test]
    async fn test_decode_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"definitely not an image").unwrap();

        let decoder = ImageDecoder::new(LimitsConfig::default());
        let err = decoder.decode(&path_to_locator(&path)).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Decode { .. } | PipelineError::UnsupportedFormat { .. }
        ));
    }

    #[tokio::test]
    async fn test_decode_missing_file() {
        let decoder = ImageDecoder::new(LimitsConfig::default());
        let err = decoder.decode("file:///nonexistent/img.png").await.unwrap_err();
        assert!(err.to_string().contains("Cannot read file"));
    }

    #[tokio::test]
    async fn test_decode_enforces_max_dimension() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "wide.png", 64, 8);
        let decoder = ImageDecoder::new(LimitsConfig {
            max_image_dimension: 32,
            ..LimitsConfig::default()
        });

        let err = decoder.decode(&path_to_locator(&path)).await.unwrap_err();
        assert!(matches!(err, PipelineError::ImageTooLarge { width: 64, .. }));
    }
}
