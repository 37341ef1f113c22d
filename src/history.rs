use std::collections::VecDeque;

pub const DEFAULT_CAPACITY: usize = 50;

/// Linear undo history with a fixed capacity. The oldest entry is evicted
/// when a push would exceed it.
#[derive(Clone, Debug)]
pub struct UndoHistory<T: Clone> {
    stack: VecDeque<T>,
    cursor: usize,
    capacity: usize,
}

impl<T: Clone> UndoHistory<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            stack: VecDeque::with_capacity(capacity),
            cursor: 0,
            capacity,
        }
    }

    pub fn push_snapshot(&mut self, value: T) {
        if self.cursor + 1 < self.stack.len() {
            self.stack.truncate(self.cursor + 1);
        }
        self.stack.push_back(value);
        while self.stack.len() > self.capacity {
            self.stack.pop_front();
        }
        self.cursor = self.stack.len().saturating_sub(1);
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.stack.len()
    }

    pub fn undo(&mut self) -> Option<T> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        self.stack.get(self.cursor).cloned()
    }

    pub fn redo(&mut self) -> Option<T> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        self.stack.get(self.cursor).cloned()
    }

    pub fn current(&self) -> Option<&T> {
        self.stack.get(self.cursor)
    }

    /// Position of the current entry, `None` while empty.
    pub fn index(&self) -> Option<usize> {
        (!self.stack.is_empty()).then_some(self.cursor)
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear_with(&mut self, value: T) {
        self.stack.clear();
        self.stack.push_back(value);
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::{UndoHistory, DEFAULT_CAPACITY};

    #[test]
    fn undo_redo_flow() {
        let mut history = UndoHistory::new(DEFAULT_CAPACITY);
        history.push_snapshot(vec![1]);
        history.push_snapshot(vec![1, 2]);
        history.push_snapshot(vec![1, 2, 3]);

        assert_eq!(history.undo(), Some(vec![1, 2]));
        assert_eq!(history.undo(), Some(vec![1]));
        assert_eq!(history.undo(), None);

        assert_eq!(history.redo(), Some(vec![1, 2]));
        history.push_snapshot(vec![9]);
        assert_eq!(history.redo(), None);
        assert_eq!(history.len(), 3);
        assert_eq!(history.current(), Some(&vec![9]));
    }

    #[test]
    fn empty_history_has_no_index() {
        let mut history: UndoHistory<u8> = UndoHistory::new(4);
        assert_eq!(history.index(), None);
        assert_eq!(history.undo(), None);
        assert_eq!(history.redo(), None);
        history.push_snapshot(1);
        assert_eq!(history.index(), Some(0));
    }

    #[test]
    fn eviction_keeps_cursor_on_newest() {
        let mut history = UndoHistory::new(DEFAULT_CAPACITY);
        for value in 0..60 {
            history.push_snapshot(value);
        }
        assert_eq!(history.len(), DEFAULT_CAPACITY);
        assert_eq!(history.index(), Some(DEFAULT_CAPACITY - 1));
        assert_eq!(history.current(), Some(&59));
        assert!(!history.can_redo());

        let mut oldest = None;
        while let Some(value) = history.undo() {
            oldest = Some(value);
        }
        assert_eq!(oldest, Some(10));
    }

    #[test]
    fn push_after_undo_drops_redo_branch() {
        let mut history = UndoHistory::new(3);
        history.push_snapshot('a');
        history.push_snapshot('b');
        history.push_snapshot('c');
        history.undo();
        history.undo();
        history.push_snapshot('z');
        assert_eq!(history.len(), 2);
        assert!(!history.can_redo());
        assert_eq!(history.undo(), Some('a'));
    }

    #[test]
    fn clear_with_resets_to_single_entry() {
        let mut history = UndoHistory::new(3);
        history.push_snapshot(1);
        history.push_snapshot(2);
        history.clear_with(7);
        assert_eq!(history.len(), 1);
        assert_eq!(history.current(), Some(&7));
        assert!(!history.can_undo());
    }
}
