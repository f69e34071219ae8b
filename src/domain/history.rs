//! Size-capped append-only history.

use std::collections::VecDeque;

use serde::Serialize;

/// Append-only log that trims its oldest entries in a batch once it grows
/// past `capacity`.
///
/// After any push the length is at most `capacity`, and the most recently
/// pushed item is always retained. Trimming happens in batches of
/// `trim_batch` so a full log is not shifted on every append.
#[derive(Debug, Clone, Serialize)]
pub struct BoundedHistory<T> {
    items: VecDeque<T>,
    capacity: usize,
    trim_batch: usize,
}

impl<T> BoundedHistory<T> {
    /// Create an empty history.
    ///
    /// `trim_batch` is clamped to `1..=capacity`.
    #[must_use]
    pub fn new(capacity: usize, trim_batch: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::new(),
            capacity,
            trim_batch: trim_batch.clamp(1, capacity),
        }
    }

    pub fn push(&mut self, item: T) {
        self.items.push_back(item);
        if self.items.len() > self.capacity {
            let excess = self.items.len() - self.capacity;
            let trim = self.trim_batch.max(excess);
            self.items.drain(..trim);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterate oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.items.iter()
    }

    #[must_use]
    pub fn last(&self) -> Option<&T> {
        self.items.back()
    }

    pub fn iter_mut(&mut self) -> impl DoubleEndedIterator<Item = &mut T> {
        self.items.iter_mut()
    }
}

impl<T: Clone> BoundedHistory<T> {
    /// Copy out the `limit` most recent entries, oldest first.
    ///
    /// A `limit` of zero returns everything.
    #[must_use]
    pub fn recent(&self, limit: usize) -> Vec<T> {
        let take = if limit == 0 {
            self.items.len()
        } else {
            limit.min(self.items.len())
        };
        self.items
            .iter()
            .skip(self.items.len() - take)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}
