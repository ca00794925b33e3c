//! Monotonic FIFO of pending image ids with a single consumer.
//!
//! The producer side ([`IngestQueue`]) is cheap to clone and never blocks.
//! An id is accepted only if it is strictly greater than every id accepted
//! before it, which absorbs duplicate change notifications and keeps FIFO
//! order identical to ascending id order.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::error::{PipelineError, PipelineResult};

struct Shared {
    /// Highest id accepted so far; the lock also orders sends
    high_water: Mutex<i64>,
    depth: AtomicUsize,
    /// 0 means unbounded
    max_depth: usize,
}

/// Producer handle for the ingest queue.
#[derive(Clone)]
pub struct IngestQueue {
    tx: mpsc::UnboundedSender<i64>,
    shared: Arc<Shared>,
}

/// The single consumer end of the ingest queue.
pub struct QueueReceiver {
    rx: mpsc::UnboundedReceiver<i64>,
    shared: Arc<Shared>,
}

/// Create a queue pair. `max_depth` of 0 leaves the queue unbounded.
pub fn ingest_queue(max_depth: usize) -> (IngestQueue, QueueReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let shared = Arc::new(Shared {
        high_water: Mutex::new(i64::MIN),
        depth: AtomicUsize::new(0),
        max_depth,
    });
    (
        IngestQueue {
            tx,
            shared: shared.clone(),
        },
        QueueReceiver { rx, shared },
    )
}

impl IngestQueue {
    /// Append an id if it is newer than anything accepted before.
    ///
    /// Returns `Ok(true)` when queued and `Ok(false)` for a stale or
    /// duplicate id. When the depth cap is hit the id is rejected with
    /// [`PipelineError::QueueFull`] but still raises the high-water mark, so
    /// a later duplicate notice cannot sneak it back in.
    pub fn enqueue(&self, image_id: i64) -> PipelineResult<bool> {
        let mut high_water = self
            .shared
            .high_water
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if image_id <= *high_water {
            return Ok(false);
        }
        *high_water = image_id;

        let depth = self.shared.depth.load(Ordering::SeqCst);
        if self.shared.max_depth > 0 && depth >= self.shared.max_depth {
            return Err(PipelineError::QueueFull { image_id, depth });
        }

        self.shared.depth.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(image_id).is_err() {
            self.shared.depth.fetch_sub(1, Ordering::SeqCst);
            return Err(PipelineError::QueueClosed);
        }
        Ok(true)
    }

    /// Ids waiting to be processed.
    pub fn depth(&self) -> usize {
        self.shared.depth.load(Ordering::SeqCst)
    }

    /// Highest id ever accepted, if any.
    pub fn high_water(&self) -> Option<i64> {
        let high_water = *self
            .shared
            .high_water
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        (high_water != i64::MIN).then_some(high_water)
    }
}

impl QueueReceiver {
    /// Wait for the oldest pending id.
    ///
    /// Returns `None` once every producer handle is dropped and the queue
    /// is drained.
    pub async fn dequeue(&mut self) -> Option<i64> {
        let id = self.rx.recv().await?;
        self.shared.depth.fetch_sub(1, Ordering::SeqCst);
        Some(id)
    }

    /// Ids waiting to be processed.
    pub fn depth(&self) -> usize {
        self.shared.depth.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fifo_order() {
        let (queue, mut rx) = ingest_queue(0);
        assert!(queue.enqueue(3).unwrap());
        assert!(queue.enqueue(7).unwrap());
        assert!(queue.enqueue(12).unwrap());
        assert_eq!(queue.depth(), 3);

        assert_eq!(rx.dequeue().await, Some(3));
        assert_eq!(rx.dequeue().await, Some(7));
        assert_eq!(rx.dequeue().await, Some(12));
        assert_eq!(rx.depth(), 0);
    }

    #[tokio::test]
    async fn test_rejects_stale_and_duplicate_ids() {
        let (queue, mut rx) = ingest_queue(0);
        assert!(queue.enqueue(10).unwrap());
        assert!(!queue.enqueue(10).unwrap());
        assert!(!queue.enqueue(4).unwrap());

        // Dequeuing does not lower the bar.
        assert_eq!(rx.dequeue().await, Some(10));
        assert!(!queue.enqueue(10).unwrap());
        assert!(queue.enqueue(11).unwrap());
        assert_eq!(queue.high_water(), Some(11));
    }

    #[tokio::test]
    async fn test_concurrent_bursts_stay_monotonic() {
        let (queue, mut rx) = ingest_queue(0);

        let mut handles = Vec::new();
        for worker in 0..8i64 {
            let queue = queue.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..50i64 {
                    let _ = queue.enqueue(i * 8 + worker);
                    let _ = queue.enqueue(i * 8 + worker);
                    tokio::task::yield_now().await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        drop(queue);

        let mut seen = Vec::new();
        while let Some(id) = rx.dequeue().await {
            seen.push(id);
        }
        assert!(!seen.is_empty());
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn test_depth_cap_rejects_newest() {
        let (queue, mut rx) = ingest_queue(2);
        assert!(queue.enqueue(1).unwrap());
        assert!(queue.enqueue(2).unwrap());

        let err = queue.enqueue(3).unwrap_err();
        assert!(matches!(err, PipelineError::QueueFull { image_id: 3, depth: 2 }));
        // The dropped id is never re-admitted.
        assert_eq!(rx.dequeue().await, Some(1));
        assert!(!queue.enqueue(3).unwrap());
        assert!(queue.enqueue(4).unwrap());
    }

    #[tokio::test]
    async fn test_closed_queue() {
        let (queue, rx) = ingest_queue(0);
        drop(rx);
        assert!(matches!(queue.enqueue(1), Err(PipelineError::QueueClosed)));
        assert_eq!(queue.depth(), 0);
    }

    #[test]
    fn test_empty_high_water() {
        let (queue, _rx) = ingest_queue(0);
        assert_eq!(queue.high_water(), None);
    }
}
