use hostmon_common::types::Snapshot;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

/// FIFO of snapshots awaiting the next flush.
///
/// Any number of producers may enqueue; the flush scheduler drains. When
/// `capacity` is reached the oldest entry is dropped so enqueue never blocks.
pub struct SnapshotBuffer {
    queue: Mutex<VecDeque<Snapshot>>,
    capacity: usize,
    dropped: AtomicU64,
}

impl SnapshotBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
            dropped: AtomicU64::new(0),
        }
    }

    pub fn enqueue(&self, snapshot: Snapshot) {
        let evicted = {
            let mut queue = self.queue.lock();
            let evicted = if queue.len() >= self.capacity {
                queue.pop_front()
            } else {
                None
            };
            queue.push_back(snapshot);
            evicted
        };

        if let Some(old) = evicted {
            let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::warn!(
                capacity = self.capacity,
                dropped_total = total,
                evicted_at = %old.timestamp,
                "Snapshot buffer full, dropped oldest entry"
            );
        }
    }

    /// Removes and returns everything queued, oldest first.
    pub fn drain(&self) -> Vec<Snapshot> {
        let mut queue = self.queue.lock();
        queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    /// Snapshots evicted because the buffer was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
