//! Bounded capture buffers for diagnostics
//!
//! Console and network captures keep only the most recent entries. Pushing
//! into a full buffer evicts the oldest entry.

use std::collections::VecDeque;

/// Console entries kept per tab.
pub const CONSOLE_CAPACITY: usize = 200;

/// Network entries kept per tab.
pub const NETWORK_CAPACITY: usize = 50;

/// Fixed-capacity FIFO.
#[derive(Debug, Clone)]
pub struct CaptureBuffer<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T> CaptureBuffer<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an entry, returning the evicted one if the buffer was full.
    pub fn push(&mut self, entry: T) -> Option<T> {
        if self.capacity == 0 {
            return Some(entry);
        }
        let evicted = if self.entries.len() == self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(entry);
        evicted
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.entries.iter()
    }

    /// Newest to oldest, the order a diagnostics panel lists network calls.
    pub fn newest_first(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().rev()
    }

    pub fn latest(&self) -> Option<&T> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_when_full() {
        let mut buf = CaptureBuffer::with_capacity(3);
        assert_eq!(buf.push(1), None);
        assert_eq!(buf.push(2), None);
        assert_eq!(buf.push(3), None);
        assert_eq!(buf.push(4), Some(1));
        assert_eq!(buf.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(buf.newest_first().copied().collect::<Vec<_>>(), vec![4, 3, 2]);
        assert_eq!(buf.latest(), Some(&4));
    }

    #[test]
    fn console_buffer_keeps_last_200() {
        let mut buf = CaptureBuffer::with_capacity(CONSOLE_CAPACITY);
        for i in 0..250 {
            buf.push(i);
        }
        assert_eq!(buf.len(), CONSOLE_CAPACITY);
        assert_eq!(buf.iter().next(), Some(&50));
    }

    #[test]
    fn zero_capacity_keeps_nothing() {
        let mut buf = CaptureBuffer::with_capacity(0);
        assert_eq!(buf.push("x"), Some("x"));
        assert!(buf.is_empty());
    }
}
