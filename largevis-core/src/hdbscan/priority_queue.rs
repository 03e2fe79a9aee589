//! Indexed binary min-heap over node ids with decrease-key.
//!
//! Keys compare with `f32::total_cmp`; ties go to the smaller id so Prim's
//! extraction order is deterministic.

use std::cmp::Ordering;

#[derive(Clone, Debug)]
pub(crate) struct IndexedMinQueue {
    heap: Vec<usize>,
    position: Vec<Option<usize>>,
    keys: Vec<f32>,
}

impl IndexedMinQueue {
    /// Creates an empty queue accepting ids in `0..capacity`.
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            heap: Vec::with_capacity(capacity),
            position: vec![None; capacity],
            keys: vec![f32::INFINITY; capacity],
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub(crate) fn contains(&self, id: usize) -> bool {
        self.position.get(id).is_some_and(Option::is_some)
    }

    /// Current key of a queued id.
    pub(crate) fn key(&self, id: usize) -> Option<f32> {
        self.contains(id).then(|| self.keys[id])
    }

    /// Inserts `id` with `key`. Returns `false` when the id is out of range or
    /// already queued.
    pub(crate) fn insert(&mut self, id: usize, key: f32) -> bool {
        if id >= self.position.len() || self.contains(id) {
            return false;
        }
        self.keys[id] = key;
        self.position[id] = Some(self.heap.len());
        self.heap.push(id);
        self.sift_up(self.heap.len() - 1);
        true
    }

    /// Lowers the key of a queued id. Keys that are not strictly lower leave
    /// the queue untouched and return `false`.
    pub(crate) fn decrease_key(&mut self, id: usize, key: f32) -> bool {
        let Some(slot) = self.position.get(id).copied().flatten() else {
            return false;
        };
        if key.total_cmp(&self.keys[id]) != Ordering::Less {
            return false;
        }
        self.keys[id] = key;
        self.sift_up(slot);
        true
    }

    /// Removes and returns the id with the smallest key.
    pub(crate) fn delete_min(&mut self) -> Option<(usize, f32)> {
        let last = self.heap.len().checked_sub(1)?;
        self.swap(0, last);
        let id = self.heap.pop()?;
        self.position[id] = None;
        if !self.heap.is_empty() {
            self.sift_down(0);
        }
        Some((id, self.keys[id]))
    }

    fn less(&self, a: usize, b: usize) -> bool {
        let (left, right) = (self.heap[a], self.heap[b]);
        self.keys[left]
            .total_cmp(&self.keys[right])
            .then(left.cmp(&right))
            == Ordering::Less
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        self.position[self.heap[a]] = Some(a);
        self.position[self.heap[b]] = Some(b);
    }

    fn sift_up(&mut self, mut slot: usize) {
        while slot > 0 {
            let parent = (slot - 1) / 2;
            if !self.less(slot, parent) {
                break;
            }
            self.swap(slot, parent);
            slot = parent;
        }
    }

    fn sift_down(&mut self, mut slot: usize) {
        loop {
            let left = 2 * slot + 1;
            let right = left + 1;
            let mut smallest = slot;
            if left < self.heap.len() && self.less(left, smallest) {
                smallest = left;
            }
            if right < self.heap.len() && self.less(right, smallest) {
                smallest = right;
            }
            if smallest == slot {
                return;
            }
            self.swap(slot, smallest);
            slot = smallest;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn delete_min_returns_keys_in_order() {
        let mut queue = IndexedMinQueue::new(4);
        for (id, key) in [(0, 3.0), (1, 1.0), (2, 2.0), (3, 0.5)] {
            assert!(queue.insert(id, key));
        }
        let order: Vec<_> = std::iter::from_fn(|| queue.delete_min()).collect();
        assert_eq!(order, vec![(3, 0.5), (1, 1.0), (2, 2.0), (0, 3.0)]);
        assert!(queue.is_empty());
    }

    #[test]
    fn decrease_key_only_lowers() {
        let mut queue = IndexedMinQueue::new(3);
        queue.insert(0, 1.0);
        queue.insert(1, 2.0);
        assert!(!queue.decrease_key(1, 5.0));
        assert!(!queue.decrease_key(1, 2.0));
        assert_eq!(queue.key(1), Some(2.0));
        assert!(queue.decrease_key(1, 0.25));
        assert_eq!(queue.delete_min(), Some((1, 0.25)));
        assert!(!queue.decrease_key(1, 0.0), "removed ids are ignored");
        assert!(!queue.decrease_key(2, 0.0), "never-inserted ids are ignored");
    }

    #[test]
    fn insert_rejects_duplicates_and_out_of_range() {
        let mut queue = IndexedMinQueue::new(2);
        assert!(queue.insert(0, 1.0));
        assert!(!queue.insert(0, 0.0));
        assert!(!queue.insert(2, 0.0));
        assert_eq!(queue.len(), 1);
        assert!(queue.contains(0));
        assert!(!queue.contains(1));
    }

    #[test]
    fn equal_keys_break_ties_by_id() {
        let mut queue = IndexedMinQueue::new(3);
        queue.insert(2, 1.0);
        queue.insert(0, 1.0);
        queue.insert(1, 1.0);
        assert_eq!(queue.delete_min(), Some((0, 1.0)));
        assert_eq!(queue.delete_min(), Some((1, 1.0)));
    }

    #[test]
    fn infinite_keys_sort_last() {
        let mut queue = IndexedMinQueue::new(3);
        queue.insert(0, f32::INFINITY);
        queue.insert(1, -1.0);
        queue.insert(2, 7.0);
        assert_eq!(queue.delete_min(), Some((1, -1.0)));
        assert_eq!(queue.delete_min(), Some((2, 7.0)));
        assert_eq!(queue.delete_min(), Some((0, f32::INFINITY)));
        assert_eq!(queue.delete_min(), None);
    }

    proptest! {
        #![proptest_config(crate::test_utils::suite_proptest_config(128))]

        #[test]
        fn matches_sorted_order_after_decreases(
            keys in prop::collection::vec(0.0_f32..100.0, 1..64),
            decreases in prop::collection::vec((any::<prop::sample::Index>(), 0.0_f32..100.0), 0..64),
        ) {
            let mut queue = IndexedMinQueue::new(keys.len());
            let mut expected = keys.clone();
            for (id, &key) in keys.iter().enumerate() {
                queue.insert(id, key);
            }
            for (index, key) in decreases {
                let id = index.index(keys.len());
                if queue.decrease_key(id, key) {
                    expected[id] = key;
                }
                prop_assert!(expected[id] <= keys[id]);
            }
            let mut sorted: Vec<(usize, f32)> = expected.into_iter().enumerate().collect();
            sorted.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
            let drained: Vec<_> = std::iter::from_fn(|| queue.delete_min()).collect();
            prop_assert_eq!(drained, sorted);
        }
    }
}
