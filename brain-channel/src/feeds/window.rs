//! Bounded newest-first buffer.

use std::collections::VecDeque;

/// Bounded list that keeps the most recent items, newest first.
///
/// ```
/// use brain_channel::feeds::RollingWindow;
///
/// let mut window = RollingWindow::new(2);
/// window.push(1);
/// window.push(2);
/// window.push(3);
/// assert_eq!(window.to_vec(), vec![3, 2]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollingWindow<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> RollingWindow<T> {
    /// Creates an empty window holding at most `capacity` items.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Prepends `item`, dropping the oldest entry once full.
    pub fn push(&mut self, item: T) {
        self.items.push_front(item);
        self.items.truncate(self.capacity);
    }

    /// Most recent item.
    #[must_use]
    pub fn latest(&self) -> Option<&T> {
        self.items.front()
    }

    /// Iterates newest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Number of items held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if no items are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Maximum number of items.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Removes all items.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<T: Clone> RollingWindow<T> {
    /// Copies the items out, newest first.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}
