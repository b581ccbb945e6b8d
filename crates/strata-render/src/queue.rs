//! Draw queue: collect keyed draws, sort them, and walk them in state-change groups.
//!
//! Draws are ordered purely by [`RenderSortKey`]. Runs of draws sharing a layer
//! and deferred pass are yielded together so a backend can bind per-group state
//! once.

use crate::RenderSortKey;

/// A batch of keyed draws for one frame.
#[derive(Debug)]
pub struct DrawQueue<T> {
    entries: Vec<(RenderSortKey, T)>,
    sorted: bool,
}

impl<T> Default for DrawQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DrawQueue<T> {
    /// Create a new empty queue.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            sorted: true,
        }
    }

    /// Create a new queue with preallocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            sorted: true,
        }
    }

    /// Add a draw to the queue.
    pub fn push(&mut self, key: RenderSortKey, draw: T) {
        if let Some((last, _)) = self.entries.last()
            && *last > key
        {
            self.sorted = false;
        }
        self.entries.push((key, draw));
    }

    /// Sort draws by key. Equal keys keep submission order.
    pub fn sort(&mut self) {
        if !self.sorted {
            self.entries.sort_by_key(|(key, _)| *key);
            self.sorted = true;
        }
    }

    /// Clear the queue for reuse next frame, keeping allocated capacity.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.sorted = true;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the draws are currently in key order.
    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    /// Iterate over draws in their current order.
    pub fn iter(&self) -> impl Iterator<Item = &(RenderSortKey, T)> {
        self.entries.iter()
    }

    /// Iterate over runs of draws sharing layer and deferred pass.
    ///
    /// For correct grouping, call [`sort`](Self::sort) first.
    pub fn groups(&self) -> DrawGroupIter<'_, T> {
        DrawGroupIter {
            entries: &self.entries,
            cursor: 0,
        }
    }
}

/// A run of draws sharing layer and deferred pass.
#[derive(Debug)]
pub struct DrawGroup<'a, T> {
    pub layer: u8,
    pub deferred_pass: u8,
    pub draws: &'a [(RenderSortKey, T)],
}

/// Iterator over [`DrawGroup`]s within a [`DrawQueue`].
pub struct DrawGroupIter<'a, T> {
    entries: &'a [(RenderSortKey, T)],
    cursor: usize,
}

impl<'a, T> Iterator for DrawGroupIter<'a, T> {
    type Item = DrawGroup<'a, T>;

    fn next(&mut self) -> Option<Self::Item> {
        let (first, _) = self.entries.get(self.cursor)?;
        let layer = first.layer();
        let deferred_pass = first.deferred_pass();

        let start = self.cursor;
        while let Some((key, _)) = self.entries.get(self.cursor)
            && key.layer() == layer
            && key.deferred_pass() == deferred_pass
        {
            self.cursor += 1;
        }

        Some(DrawGroup {
            layer,
            deferred_pass,
            draws: &self.entries[start..self.cursor],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SortKeyFields;

    fn key(layer: u8, deferred_pass: u8, depth: u16) -> RenderSortKey {
        RenderSortKey::encode(&SortKeyFields {
            layer,
            deferred_pass,
            depth,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_empty_queue_has_no_groups() {
        let queue: DrawQueue<u32> = DrawQueue::new();
        assert!(queue.is_empty());
        assert_eq!(queue.groups().count(), 0);
    }

    #[test]
    fn test_sort_orders_by_key() {
        let mut queue = DrawQueue::new();
        queue.push(key(1, 0, 5), "c");
        queue.push(key(0, 0, 9), "b");
        queue.push(key(0, 0, 1), "a");
        assert!(!queue.is_sorted());
        queue.sort();
        assert!(queue.is_sorted());
        let order: Vec<_> = queue.iter().map(|(_, d)| *d).collect();
        assert_eq!(order, ["a", "b", "c"]);
    }

    #[test]
    fn test_in_order_pushes_stay_sorted() {
        let mut queue = DrawQueue::with_capacity(4);
        queue.push(key(0, 0, 1), 1);
        queue.push(key(0, 0, 1), 2);
        queue.push(key(0, 1, 0), 3);
        assert!(queue.is_sorted());
    }

    #[test]
    fn test_groups_split_on_layer_and_deferred_pass() {
        let mut queue = DrawQueue::new();
        queue.push(key(0, 0, 3), 0);
        queue.push(key(0, 0, 1), 1);
        queue.push(key(0, 2, 0), 2);
        queue.push(key(3, 0, 0), 3);
        queue.sort();

        let groups: Vec<_> = queue.groups().collect();
        assert_eq!(groups.len(), 3);
        assert_eq!((groups[0].layer, groups[0].deferred_pass), (0, 0));
        assert_eq!(groups[0].draws.len(), 2);
        assert_eq!((groups[1].layer, groups[1].deferred_pass), (0, 2));
        assert_eq!((groups[2].layer, groups[2].deferred_pass), (3, 0));
    }

    #[test]
    fn test_clear_resets_queue() {
        let mut queue = DrawQueue::new();
        queue.push(key(1, 0, 0), ());
        queue.push(key(0, 0, 0), ());
        queue.clear();
        assert!(queue.is_empty());
        assert!(queue.is_sorted());
    }
}
