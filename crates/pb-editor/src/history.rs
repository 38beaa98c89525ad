//! Bounded change log.
//!
//! Every successful apply is appended here. The oldest entries fall off once
//! `max_depth` is reached. Each entry keeps its `Revert` data so an undo
//! stack can be layered on later without changing the dispatcher.

use pb_core::{AppliedChange, NodeId};
use std::collections::VecDeque;

pub struct ChangeLog {
    entries: VecDeque<AppliedChange>,
    /// Maximum retained entries.
    max_depth: usize,
    /// Changes recorded since creation, including evicted ones.
    total: u64,
}

impl ChangeLog {
    pub fn new(max_depth: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_depth.min(256)),
            max_depth,
            total: 0,
        }
    }

    pub fn push(&mut self, change: AppliedChange) {
        if self.max_depth == 0 {
            self.total += 1;
            return;
        }
        if self.entries.len() == self.max_depth {
            self.entries.pop_front();
        }
        self.entries.push_back(change);
        self.total += 1;
    }

    pub fn last(&self) -> Option<&AppliedChange> {
        self.entries.back()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &AppliedChange> {
        self.entries.iter()
    }

    /// Most recent changes that touched `id`, newest first.
    pub fn touching(&self, id: NodeId) -> impl Iterator<Item = &AppliedChange> {
        self.entries
            .iter()
            .rev()
            .filter(move |c| c.affected_node_ids.contains(&id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_recorded(&self) -> u64 {
        self.total
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pb_core::{IntentKind, Revert};

    fn change(id: &str) -> AppliedChange {
        let node_id = NodeId::intern(id);
        AppliedChange::new(IntentKind::AddComponent, [node_id], Revert::RemoveAdded { node_id })
    }

    #[test]
    fn oldest_entries_are_evicted() {
        let mut log = ChangeLog::new(2);
        log.push(change("a-1"));
        log.push(change("a-2"));
        log.push(change("a-3"));
        assert_eq!(log.len(), 2);
        assert_eq!(log.total_recorded(), 3);
        let first = log.iter().next().unwrap();
        assert_eq!(first.primary_node(), Some(NodeId::intern("a-2")));
        assert_eq!(log.last().unwrap().primary_node(), Some(NodeId::intern("a-3")));
    }

    #[test]
    fn zero_depth_records_nothing() {
        let mut log = ChangeLog::new(0);
        log.push(change("a-1"));
        assert!(log.is_empty());
        assert_eq!(log.total_recorded(), 1);
    }

    #[test]
    fn touching_filters_by_node() {
        let mut log = ChangeLog::new(10);
        log.push(change("t-1"));
        log.push(change("t-2"));
        log.push(change("t-1"));
        assert_eq!(log.touching(NodeId::intern("t-1")).count(), 2);
        log.clear();
        assert!(log.is_empty());
    }
}
