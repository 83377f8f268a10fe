//! Rolling history
//!
//! Fixed-capacity per-channel history used for live display. All seven
//! channel buffers sit behind one lock so readers never see a sample applied
//! to some channels and not others.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::frame::{Channel, Sample, CHANNEL_COUNT};

/// Default number of values kept per channel
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Oldest-evicting sequence of scalar values for one channel
#[derive(Debug, Clone)]
pub struct RollingBuffer {
    values: VecDeque<f64>,
    capacity: usize,
}

impl RollingBuffer {
    /// Create an empty buffer holding at most `capacity` values
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a value, evicting the oldest if full
    pub fn push(&mut self, value: f64) {
        if self.values.len() >= self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    /// Number of values currently held
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Maximum number of values
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recent value
    pub fn latest(&self) -> Option<f64> {
        self.values.back().copied()
    }

    /// Values oldest-first
    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.values.iter()
    }

    /// Copy of the values, oldest-first
    pub fn to_vec(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }

    fn clear(&mut self) {
        self.values.clear();
    }
}

/// Consistent, read-only copy of all channel histories
///
/// Index `i` of every channel corresponds to the same original sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BufferSnapshot {
    /// Per-channel values, oldest-first, in [`Channel::ALL`] order
    pub channels: Vec<Vec<f64>>,
    /// Configured capacity per channel
    pub capacity: usize,
}

impl BufferSnapshot {
    /// Values for one channel
    pub fn channel(&self, channel: Channel) -> &[f64] {
        self.channels
            .get(channel.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of aligned samples held
    pub fn len(&self) -> usize {
        self.channels.first().map(Vec::len).unwrap_or(0)
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The seven channel buffers, guarded together
pub struct RollingBufferSet {
    buffers: Mutex<[RollingBuffer; CHANNEL_COUNT]>,
    capacity: usize,
}

impl RollingBufferSet {
    /// Create a set where every channel holds at most `capacity` values
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffers: Mutex::new(std::array::from_fn(|_| RollingBuffer::new(capacity))),
            capacity,
        }
    }

    /// Capacity shared by all channels
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Push every channel of `sample` under a single lock
    pub fn append(&self, sample: &Sample) {
        let mut buffers = self.lock();
        for (buffer, value) in buffers.iter_mut().zip(sample.values) {
            buffer.push(value);
        }
    }

    /// Take a consistent copy of all channels
    pub fn snapshot(&self) -> BufferSnapshot {
        let buffers = self.lock();
        BufferSnapshot {
            channels: buffers.iter().map(RollingBuffer::to_vec).collect(),
            capacity: self.capacity,
        }
    }

    /// Number of samples currently held
    pub fn len(&self) -> usize {
        self.lock()[0].len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all history
    pub fn clear(&self) {
        for buffer in self.lock().iter_mut() {
            buffer.clear();
        }
    }

    fn lock(&self) -> MutexGuard<'_, [RollingBuffer; CHANNEL_COUNT]> {
        // Every critical section leaves the buffers aligned, so a poisoned
        // lock still guards consistent data.
        self.buffers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for RollingBufferSet {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn sample(base: f64) -> Sample {
        Sample::new(
            Utc::now(),
            std::array::from_fn(|i| base + i as f64 * 0.1),
        )
    }

    #[test]
    fn test_rolling_buffer_evicts_oldest() {
        let mut buffer = RollingBuffer::new(3);
        for v in 1..=5 {
            buffer.push(v as f64);
        }
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.to_vec(), vec![3.0, 4.0, 5.0]);
        assert_eq!(buffer.latest(), Some(5.0));
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let buffer = RollingBuffer::new(0);
        assert_eq!(buffer.capacity(), 1);
    }

    #[test]
    fn test_set_keeps_most_recent_n() {
        let set = RollingBufferSet::new(100);
        for i in 0..250 {
            set.append(&sample(i as f64));
        }

        let snap = set.snapshot();
        assert_eq!(snap.len(), 100);
        for channel in Channel::ALL {
            assert_eq!(snap.channel(channel).len(), 100);
        }
        assert_eq!(snap.channel(Channel::AccX)[0], 150.0);
        assert_eq!(snap.channel(Channel::AccX)[99], 249.0);
    }

    #[test]
    fn test_snapshot_is_detached_from_live_buffers() {
        let set = RollingBufferSet::new(4);
        set.append(&sample(1.0));
        let snap = set.snapshot();
        set.append(&sample(2.0));
        assert_eq!(snap.len(), 1);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_concurrent_readers_never_see_torn_updates() {
        use std::sync::Arc;

        let set = Arc::new(RollingBufferSet::new(16));
        let writer = {
            let set = set.clone();
            std::thread::spawn(move || {
                for i in 0..2000 {
                    set.append(&sample(i as f64));
                }
            })
        };

        for _ in 0..500 {
            let snap = set.snapshot();
            let len = snap.len();
            assert!(snap.channels.iter().all(|c| c.len() == len));
        }
        writer.join().unwrap();
    }
}
