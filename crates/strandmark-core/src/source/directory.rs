//! A [`ChangeSource`] over a filesystem directory.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use async_trait::async_trait;
use walkdir::WalkDir;

use crate::config::WatchConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::decode::path_to_locator;
use crate::types::ImageRecord;

use super::ChangeSource;

/// Assigns ids to image files in first-seen order.
///
/// Each [`max_id`](ChangeSource::max_id) call rescans the directory; files
/// not seen before get the next ids, oldest modification time first. Ids
/// are never reused within the lifetime of the source.
#[derive(Clone)]
pub struct DirectorySource {
    inner: Arc<Inner>,
}

struct Inner {
    root: PathBuf,
    recursive: bool,
    supported_formats: Vec<String>,
    registry: Mutex<Registry>,
}

#[derive(Default)]
struct Registry {
    known: HashSet<PathBuf>,
    by_id: BTreeMap<i64, PathBuf>,
    next_id: i64,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>, config: &WatchConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                root: root.into(),
                recursive: config.recursive,
                supported_formats: config.supported_formats.clone(),
                registry: Mutex::new(Registry {
                    next_id: 1,
                    ..Registry::default()
                }),
            }),
        }
    }

    /// The watched directory.
    pub fn root(&self) -> &Path {
        &self.inner.root
    }
}

impl Inner {
    /// Register any new files and return the current maximum id.
    fn scan(&self) -> PipelineResult<Option<i64>> {
        if !self.root.is_dir() {
            return Err(PipelineError::SourceUnavailable {
                message: format!("{} is not a directory", self.root.display()),
            });
        }

        let max_depth = if self.recursive { usize::MAX } else { 1 };
        let mut registry = self
            .registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut fresh: Vec<(SystemTime, PathBuf)> = WalkDir::new(&self.root)
            .max_depth(max_depth)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && self.is_supported(e.path()))
            .filter(|e| !registry.known.contains(e.path()))
            .map(|e| {
                let modified = e
                    .metadata()
                    .ok()
                    .and_then(|m| m.modified().ok())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                (modified, e.into_path())
            })
            .collect();

        // Oldest first so ids follow arrival order
        fresh.sort();

        for (_, path) in fresh {
            let id = registry.next_id;
            registry.next_id += 1;
            tracing::trace!("Registered {:?} as id {}", path, id);
            registry.known.insert(path.clone());
            registry.by_id.insert(id, path);
        }

        Ok(registry.by_id.keys().next_back().copied())
    }

    fn path_for(&self, image_id: i64) -> Option<PathBuf> {
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .by_id
            .get(&image_id)
            .cloned()
    }

    /// Check if a file has a supported extension.
    fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.supported_formats
                    .iter()
                    .any(|fmt| fmt.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }
}

fn join_error(e: tokio::task::JoinError) -> PipelineError {
    PipelineError::SourceUnavailable {
        message: format!("Task join error: {}", e),
    }
}

#[async_trait]
impl ChangeSource for DirectorySource {
    async fn max_id(&self) -> PipelineResult<Option<i64>> {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || inner.scan())
            .await
            .map_err(join_error)?
    }

    async fn query_by_id(&self, image_id: i64) -> PipelineResult<Option<ImageRecord>> {
        let Some(path) = self.inner.path_for(image_id) else {
            return Ok(None);
        };

        tokio::task::spawn_blocking(move || {
            let Ok(meta) = std::fs::metadata(&path) else {
                // Removed since it was registered
                return None;
            };
            let (width, height) = image::image_dimensions(&path).unwrap_or((0, 0));
            let display_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("unknown")
                .to_string();

            Some(ImageRecord {
                id: image_id,
                display_name,
                width,
                height,
                size_bytes: meta.len(),
                locator: path_to_locator(&path),
            })
        })
        .await
        .map_err(join_error)
    }
}
