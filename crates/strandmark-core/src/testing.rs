//! In-memory collaborators shared by the unit tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::{ConstellationExtractor, PixelBuffer, PixelSource, StrandExtractor};
use crate::sink::render;
use crate::sink::{ArtifactSink, PersistedArtifacts, Registrar, RegistrationPayload};
use crate::source::ChangeSource;
use crate::types::{ImageRecord, ProcessedImage};

const DEFAULT_SIDE: u32 = 30;

/// Deterministic, non-uniform test image.
pub fn gradient(width: u32, height: u32) -> PixelBuffer {
    PixelBuffer::from_fn(width, height, |x, y| {
        [((x * 7) % 256) as u8, ((y * 5) % 256) as u8, 128]
    })
}

fn record(id: i64, width: u32, height: u32) -> ImageRecord {
    ImageRecord {
        id,
        display_name: format!("photo_{}.png", id),
        width,
        height,
        size_bytes: 3 * 1024 * 1024 / 2,
        locator: MemorySource::locator(id),
    }
}

/// A fully extracted image with fixed timestamp and author.
pub fn processed_image(id: i64, width: u32, height: u32) -> ProcessedImage {
    let buffer = gradient(width, height);
    let mut record = record(id, width, height);
    record.locator = format!("file:///photos/photo_{}.png", id);

    ProcessedImage {
        record,
        sequence: 1,
        captured_at: "2024-01-02 03:04:05".to_string(),
        author: "agbuddy7".to_string(),
        strands: StrandExtractor::extract(&buffer, width, height).unwrap(),
        constellation: ConstellationExtractor::default().extract(&buffer),
    }
}

/// Tracks how many calls overlap.
#[derive(Default)]
pub struct Concurrency {
    active: AtomicUsize,
    max: AtomicUsize,
}

impl Concurrency {
    fn enter(&self) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn max(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct SourceState {
    records: BTreeMap<i64, ImageRecord>,
    unavailable: bool,
}

/// Change source backed by a map.
#[derive(Default)]
pub struct MemorySource {
    state: Mutex<SourceState>,
}

impl MemorySource {
    pub fn with_ids(ids: &[i64]) -> Self {
        let source = Self::default();
        for &id in ids {
            source.add(id);
        }
        source
    }

    pub fn locator(id: i64) -> String {
        format!("mem://{}", id)
    }

    pub fn add(&self, id: i64) {
        self.add_sized(id, DEFAULT_SIDE, DEFAULT_SIDE);
    }

    pub fn add_sized(&self, id: i64, width: u32, height: u32) {
        self.state
            .lock()
            .unwrap()
            .records
            .insert(id, record(id, width, height));
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unwrap().unavailable = unavailable;
    }

    fn check(&self) -> PipelineResult<()> {
        if self.state.lock().unwrap().unavailable {
            return Err(PipelineError::SourceUnavailable {
                message: "store offline".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ChangeSource for MemorySource {
    async fn max_id(&self) -> PipelineResult<Option<i64>> {
        self.check()?;
        Ok(self.state.lock().unwrap().records.keys().next_back().copied())
    }

    async fn query_by_id(&self, image_id: i64) -> PipelineResult<Option<ImageRecord>> {
        self.check()?;
        Ok(self.state.lock().unwrap().records.get(&image_id).cloned())
    }
}

/// Pixel source that synthesizes gradients.
#[derive(Default)]
pub struct MemoryPixels {
    dimensions: Mutex<HashMap<String, (u32, u32)>>,
    failing: Mutex<HashSet<String>>,
    concurrency: Concurrency,
    span: Option<Arc<Concurrency>>,
}

impl MemoryPixels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `span` on every decode. A failed decode closes it again; a
    /// successful one leaves it to the sink.
    pub fn with_span(span: Arc<Concurrency>) -> Self {
        Self {
            span: Some(span),
            ..Self::default()
        }
    }

    pub fn set_dimensions(&self, locator: &str, width: u32, height: u32) {
        self.dimensions
            .lock()
            .unwrap()
            .insert(locator.to_string(), (width, height));
    }

    pub fn fail_on(&self, locator: &str) {
        self.failing.lock().unwrap().insert(locator.to_string());
    }

    pub fn max_concurrent(&self) -> usize {
        self.concurrency.max()
    }

    fn lookup(&self, locator: &str) -> PipelineResult<(u32, u32)> {
        if self.failing.lock().unwrap().contains(locator) {
            return Err(PipelineError::Decode {
                locator: locator.to_string(),
                message: "corrupt data".to_string(),
            });
        }
        Ok(self
            .dimensions
            .lock()
            .unwrap()
            .get(locator)
            .copied()
            .unwrap_or((DEFAULT_SIDE, DEFAULT_SIDE)))
    }
}

#[async_trait]
impl PixelSource for MemoryPixels {
    async fn probe(&self, locator: &str) -> PipelineResult<(u32, u32)> {
        self.lookup(locator)
    }

    async fn decode(&self, locator: &str) -> PipelineResult<PixelBuffer> {
        if let Some(span) = &self.span {
            span.enter();
        }
        self.concurrency.enter();
        tokio::time::sleep(Duration::from_millis(2)).await;
        let result = self.lookup(locator).map(|(w, h)| gradient(w, h));
        self.concurrency.exit();
        if let (Some(span), Err(_)) = (&self.span, &result) {
            span.exit();
        }
        result
    }
}

/// Sink that only records which images it saw.
#[derive(Default)]
pub struct RecordingSink {
    persisted: Mutex<Vec<i64>>,
    concurrency: Concurrency,
    span: Option<Arc<Concurrency>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Close `span` once an image is persisted.
    pub fn with_span(span: Arc<Concurrency>) -> Self {
        Self {
            span: Some(span),
            ..Self::default()
        }
    }

    pub fn persisted_ids(&self) -> Vec<i64> {
        self.persisted.lock().unwrap().clone()
    }

    pub fn max_concurrent(&self) -> usize {
        self.concurrency.max()
    }
}

#[async_trait]
impl ArtifactSink for RecordingSink {
    async fn persist(&self, image: &ProcessedImage) -> PipelineResult<PersistedArtifacts> {
        self.concurrency.enter();
        tokio::time::sleep(Duration::from_millis(1)).await;
        let id = image.record.id;
        self.persisted.lock().unwrap().push(id);
        self.concurrency.exit();
        if let Some(span) = &self.span {
            span.exit();
        }

        Ok(PersistedArtifacts {
            strands_path: render::strands_file_name(id).into(),
            metadata_path: render::metadata_file_name(id).into(),
            constellation_path: render::constellation_file_name(id).into(),
        })
    }
}

/// Registrar that accepts or rejects everything.
pub struct RecordingRegistrar {
    accept: bool,
    registered: Mutex<Vec<String>>,
}

impl RecordingRegistrar {
    pub fn new(accept: bool) -> Self {
        Self {
            accept,
            registered: Mutex::new(Vec::new()),
        }
    }

    pub fn registered_ids(&self) -> Vec<String> {
        self.registered.lock().unwrap().clone()
    }
}

#[async_trait]
impl Registrar for RecordingRegistrar {
    async fn register(&self, payload: &RegistrationPayload) -> PipelineResult<()> {
        if !self.accept {
            return Err(PipelineError::Remote {
                message: "Registry HTTP 503".to_string(),
                status_code: Some(503),
            });
        }
        self.registered
            .lock()
            .unwrap()
            .push(payload.image_id.clone());
        Ok(())
    }
}
