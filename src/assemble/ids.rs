//! Unique id allocation for one assembly
//!
//! One allocator instance serves a whole assembly: the static build and
//! every chain injection draw from the same counter, so ids stay unique
//! across the graph's lifetime. No component may run its own counter
//! against a graph it did not allocate.

use crate::graph::NodeId;

/// Issues collision-free, monotonically increasing node ids
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    /// A fresh allocator starting at id 1
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// The next id, never repeated by this allocator
    pub fn next_id(&mut self) -> NodeId {
        let id = NodeId::from_raw(self.next);
        self.next += 1;
        id
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_start_at_one_and_increase() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.next_id().as_u64(), 1);
        assert_eq!(ids.next_id().as_u64(), 2);
        assert_eq!(ids.next_id().as_u64(), 3);
    }

    #[test]
    fn test_ids_pairwise_distinct() {
        let mut ids = IdAllocator::new();
        let issued: HashSet<u64> = (0..500).map(|_| ids.next_id().as_u64()).collect();
        assert_eq!(issued.len(), 500);
    }
}
