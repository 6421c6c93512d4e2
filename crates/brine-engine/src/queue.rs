//! Indexed binary min-heap of reactions keyed by firing time.
//!
//! Entries are ordered by `(tau, ReactionId)`, so equal firing times are
//! broken by creation order. A `ReactionId → slot` index makes key
//! updates and removals O(log n) without a remove-and-reinsert.

use brine_core::{ReactionId, Time};
use indexmap::IndexMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Entry {
    tau: Time,
    id: ReactionId,
}

/// Priority queue of scheduled reactions.
#[derive(Clone, Debug, Default)]
pub struct ReactionQueue {
    heap: Vec<Entry>,
    slots: IndexMap<ReactionId, usize>,
}

impl ReactionQueue {
    /// An empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty queue with room for `capacity` reactions.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            heap: Vec::with_capacity(capacity),
            slots: IndexMap::with_capacity(capacity),
        }
    }

    /// Number of queued reactions.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// `true` if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// `true` if `id` is queued.
    pub fn contains(&self, id: ReactionId) -> bool {
        self.slots.contains_key(&id)
    }

    /// The queued firing time of `id`.
    pub fn tau_of(&self, id: ReactionId) -> Option<Time> {
        self.slots.get(&id).map(|&slot| self.heap[slot].tau)
    }

    /// The reaction that fires next, and when.
    pub fn peek(&self) -> Option<(ReactionId, Time)> {
        self.heap.first().map(|e| (e.id, e.tau))
    }

    /// Queue `id` at `tau`, or move it there if already queued.
    pub fn schedule(&mut self, id: ReactionId, tau: Time) {
        match self.slots.get(&id) {
            Some(&slot) => self.reposition(slot, tau),
            None => {
                let slot = self.heap.len();
                self.heap.push(Entry { tau, id });
                self.slots.insert(id, slot);
                self.sift_up(slot);
            }
        }
    }

    /// Remove `id`. Returns its firing time if it was queued.
    pub fn remove(&mut self, id: ReactionId) -> Option<Time> {
        let slot = self.slots.swap_remove(&id)?;
        let removed = self.heap.swap_remove(slot);
        if slot < self.heap.len() {
            let moved = self.heap[slot].id;
            self.slots.insert(moved, slot);
            if slot > 0 && self.heap[slot] < self.heap[(slot - 1) / 2] {
                self.sift_up(slot);
            } else {
                self.sift_down(slot);
            }
        }
        Some(removed.tau)
    }

    /// Remove and return the next reaction.
    pub fn pop(&mut self) -> Option<(ReactionId, Time)> {
        let (id, tau) = self.peek()?;
        self.remove(id);
        Some((id, tau))
    }

    /// Queued reactions with their firing times, in heap order.
    pub fn iter(&self) -> impl Iterator<Item = (ReactionId, Time)> + '_ {
        self.heap.iter().map(|e| (e.id, e.tau))
    }

    fn reposition(&mut self, slot: usize, tau: Time) {
        let old = self.heap[slot].tau;
        self.heap[slot].tau = tau;
        if tau < old {
            self.sift_up(slot);
        } else if tau > old {
            self.sift_down(slot);
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        self.slots.insert(self.heap[a].id, a);
        self.slots.insert(self.heap[b].id, b);
    }

    fn sift_up(&mut self, mut slot: usize) {
        while slot > 0 {
            let parent = (slot - 1) / 2;
            if self.heap[slot] >= self.heap[parent] {
                break;
            }
            self.swap(slot, parent);
            slot = parent;
        }
    }

    fn sift_down(&mut self, mut slot: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * slot + 1;
            let right = left + 1;
            let mut smallest = slot;
            if left < len && self.heap[left] < self.heap[smallest] {
                smallest = left;
            }
            if right < len && self.heap[right] < self.heap[smallest] {
                smallest = right;
            }
            if smallest == slot {
                break;
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
    use std::collections::BTreeMap;

    fn drain(mut q: ReactionQueue) -> Vec<(ReactionId, Time)> {
        std::iter::from_fn(|| q.pop()).collect()
    }

    #[test]
    fn pops_in_time_order() {
        let mut q = ReactionQueue::new();
        q.schedule(ReactionId(0), Time::new(3.0));
        q.schedule(ReactionId(1), Time::new(1.0));
        q.schedule(ReactionId(2), Time::new(2.0));
        let ids: Vec<_> = drain(q).into_iter().map(|(id, _)| id.0).collect();
        assert_eq!(ids, [1, 2, 0]);
    }

    #[test]
    fn ties_go_to_lower_id() {
        let mut q = ReactionQueue::new();
        q.schedule(ReactionId(5), Time::new(1.0));
        q.schedule(ReactionId(2), Time::new(1.0));
        q.schedule(ReactionId(9), Time::new(1.0));
        assert_eq!(q.peek(), Some((ReactionId(2), Time::new(1.0))));
    }

    #[test]
    fn reschedule_moves_entry() {
        let mut q = ReactionQueue::new();
        q.schedule(ReactionId(0), Time::new(1.0));
        q.schedule(ReactionId(1), Time::new(2.0));
        q.schedule(ReactionId(0), Time::new(5.0));
        assert_eq!(q.len(), 2);
        assert_eq!(q.peek(), Some((ReactionId(1), Time::new(2.0))));
        assert_eq!(q.tau_of(ReactionId(0)), Some(Time::new(5.0)));
    }

    #[test]
    fn infinite_sorts_last() {
        let mut q = ReactionQueue::new();
        q.schedule(ReactionId(0), Time::INFINITY);
        q.schedule(ReactionId(1), Time::new(1e300));
        assert_eq!(q.peek().map(|(id, _)| id), Some(ReactionId(1)));
    }

    #[test]
    fn remove_unknown_is_none() {
        let mut q = ReactionQueue::new();
        assert_eq!(q.remove(ReactionId(3)), None);
        q.schedule(ReactionId(3), Time::ZERO);
        assert_eq!(q.remove(ReactionId(3)), Some(Time::ZERO));
        assert!(q.is_empty());
    }

    #[derive(Clone, Debug)]
    enum Op {
        Schedule(u64, f64),
        Remove(u64),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u64..20, 0.0f64..100.0).prop_map(|(id, t)| Op::Schedule(id, t)),
            (0u64..20).prop_map(Op::Remove),
        ]
    }

    proptest! {
        #[test]
        fn matches_ordered_model(ops in proptest::collection::vec(op(), 0..200)) {
            let mut q = ReactionQueue::new();
            let mut model: BTreeMap<ReactionId, Time> = BTreeMap::new();
            for op in ops {
                match op {
                    Op::Schedule(id, t) => {
                        q.schedule(ReactionId(id), Time::new(t));
                        model.insert(ReactionId(id), Time::new(t));
                    }
                    Op::Remove(id) => {
                        prop_assert_eq!(q.remove(ReactionId(id)), model.remove(&ReactionId(id)));
                    }
                }
                prop_assert_eq!(q.len(), model.len());
            }
            let mut expected: Vec<_> = model.into_iter().collect();
            expected.sort_by_key(|&(id, tau)| (tau, id));
            prop_assert_eq!(drain(q), expected);
        }
    }
}
