//! Pending-task queue for the worker pool.
//!
//! Sorted insert keeps the deque ordered by the dispatch rule: priority
//! descending, then (when enabled) estimated size ascending on priority
//! ties, then insertion order. Pop is O(1); insert is O(n) over the pending
//! depth, which stays small for the bursts this pool is built for.

use std::collections::VecDeque;

use super::task::TaskRecord;

/// Priority-ordered queue of pending task records.
#[derive(Debug)]
pub(crate) struct PendingQueue<T> {
    /// Records ordered head-first by dispatch preference.
    entries: VecDeque<TaskRecord<T>>,
    /// Whether equal-priority ties break on estimated size.
    prioritize_small: bool,
}

impl<T> PendingQueue<T> {
    /// Create an empty queue.
    pub(crate) fn new(prioritize_small: bool) -> Self {
        Self {
            entries: VecDeque::new(),
            prioritize_small,
        }
    }

    /// Insert a record at its dispatch position.
    ///
    /// The scan runs from the tail: the record sinks only past the entries
    /// it consecutively precedes and stops at the first one it does not.
    /// Because the tie rule treats a mixed defined/undefined size pair as
    /// equal, a sized newcomer never jumps over an earlier unsized entry at
    /// the same priority, even when a sized entry sits beyond it.
    pub(crate) fn insert(
        &mut self,
        record: TaskRecord<T>,
    ) {
        let pos = self
            .entries
            .iter()
            .rposition(|existing| !self.precedes(&record, existing))
            .map_or(0, |stop| stop + 1);
        self.entries.insert(pos, record);
    }

    /// Pop the record at the head of the dispatch order.
    #[inline]
    pub(crate) fn pop(&mut self) -> Option<TaskRecord<T>> {
        self.entries.pop_front()
    }

    /// Remove and return every pending record (shutdown path).
    pub(crate) fn drain(&mut self) -> Vec<TaskRecord<T>> {
        self.entries.drain(..).collect()
    }

    /// Get the number of pending records.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the queue is empty.
    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `a` strictly precedes `b` in dispatch order.
    ///
    /// The size tie-break only applies when priorities are equal and both
    /// sizes are defined; partially-undefined sizes fall back to insertion
    /// order. That rule is not a total order, which is why the queue uses
    /// stable sorted insert rather than a heap.
    fn precedes(
        &self,
        a: &TaskRecord<T>,
        b: &TaskRecord<T>,
    ) -> bool {
        if a.priority() != b.priority() {
            return a.priority() > b.priority();
        }
        if self.prioritize_small {
            if let (Some(a_size), Some(b_size)) = (a.estimated_size(), b.estimated_size()) {
                return a_size < b_size;
            }
        }
        false
    }
}
