//! Fixed-capacity record of recent position errors.
//!
//! Index 0 is the newest entry; pushing into a full history discards the
//! oldest. Entries are kept for diagnostics only and never feed back into
//! the control law.
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct ErrorHistory {
    entries: VecDeque<i64>,
    capacity: usize,
}

impl ErrorHistory {
    /// Create a zero-filled history. A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: std::iter::repeat_n(0, capacity).collect(),
            capacity,
        }
    }

    pub fn push(&mut self, error: i64) {
        if self.entries.len() == self.capacity {
            self.entries.pop_back();
        }
        self.entries.push_front(error);
    }

    /// Newest-first copy of all entries.
    pub fn to_vec(&self) -> Vec<i64> {
        self.entries.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.entries.iter_mut().for_each(|e| *e = 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newest_first_and_oldest_discarded() {
        let mut h = ErrorHistory::new(3);
        assert_eq!(h.to_vec(), vec![0, 0, 0]);
        for e in [1, 2, 3, 4] {
            h.push(e);
        }
        assert_eq!(h.to_vec(), vec![4, 3, 2]);
    }

    #[test]
    fn clear_zeroes_entries_in_place() {
        let mut h = ErrorHistory::new(2);
        h.push(9);
        h.clear();
        assert_eq!(h.to_vec(), vec![0, 0]);
        h.push(1);
        assert_eq!(h.to_vec(), vec![1, 0]);
    }

    #[test]
    fn zero_capacity_holds_one_entry() {
        let mut h = ErrorHistory::new(0);
        h.push(5);
        h.push(6);
        assert_eq!(h.to_vec(), vec![6]);
    }
}
