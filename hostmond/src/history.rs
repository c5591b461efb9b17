use crate::types::Metrics;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Default number of snapshots retained in memory.
pub const MAX_METRICS: usize = 50;

/// Bounded FIFO of the most recent snapshots.
///
/// One producer (the sampling activity) appends, any number of consumers copy
/// the contents out. Every operation holds the lock only for the duration of a
/// push/pop or a clone, and nothing borrowed from the deque leaves the lock.
pub struct HistoryBuffer {
    inner: Mutex<VecDeque<Metrics>>,
    capacity: usize,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn append(&self, metrics: Metrics) {
        let mut inner = self.inner.lock();
        if inner.len() == self.capacity {
            inner.pop_front();
        }
        inner.push_back(metrics);
    }

    /// Point-in-time copy, oldest first.
    pub fn snapshot_list(&self) -> Vec<Metrics> {
        let inner = self.inner.lock();
        inner.iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<Metrics> {
        self.inner.lock().back().cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(MAX_METRICS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::fixtures::metrics_at;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    #[test]
    fn evicts_oldest_first() {
        let buffer = HistoryBuffer::new(3);
        for i in 0..5 {
            buffer.append(metrics_at(i));
        }

        let list = buffer.snapshot_list();
        assert_eq!(list.len(), 3);
        assert_eq!(list[0], metrics_at(2));
        assert_eq!(list[2], metrics_at(4));
        assert_eq!(buffer.latest(), Some(metrics_at(4)));
    }

    #[test]
    fn never_exceeds_capacity() {
        let buffer = HistoryBuffer::default();
        for i in 0..(MAX_METRICS as i64 * 3) {
            buffer.append(metrics_at(i));
            assert!(buffer.len() <= MAX_METRICS);
        }
        assert_eq!(buffer.len(), MAX_METRICS);
        assert_eq!(
            buffer.snapshot_list()[0],
            metrics_at(MAX_METRICS as i64 * 2)
        );
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let buffer = HistoryBuffer::new(0);
        assert_eq!(buffer.capacity(), 1);
        buffer.append(metrics_at(0));
        buffer.append(metrics_at(1));
        assert_eq!(buffer.snapshot_list(), vec![metrics_at(1)]);
    }

    #[test]
    fn empty_buffer_yields_empty_list() {
        let buffer = HistoryBuffer::new(4);
        assert!(buffer.is_empty());
        assert!(buffer.snapshot_list().is_empty());
        assert_eq!(buffer.latest(), None);
    }

    #[test]
    fn concurrent_readers_never_observe_torn_state() {
        let buffer = Arc::new(HistoryBuffer::new(8));
        let done = Arc::new(AtomicBool::new(false));

        let readers: Vec<_> = (0..3)
            .map(|_| {
                let buffer = Arc::clone(&buffer);
                let done = Arc::clone(&done);
                thread::spawn(move || {
                    while !done.load(Ordering::Acquire) {
                        let list = buffer.snapshot_list();
                        assert!(list.len() <= 8);
                        // appends are strictly sequential, so any copy must be
                        // a contiguous run of consecutive timestamps
                        for pair in list.windows(2) {
                            let step = pair[1].timestamp - pair[0].timestamp;
                            assert_eq!(step.num_seconds(), 1);
                        }
                    }
                })
            })
            .collect();

        for i in 0..5_000 {
            buffer.append(metrics_at(i));
        }
        done.store(true, Ordering::Release);

        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(buffer.latest(), Some(metrics_at(4_999)));
    }
}
