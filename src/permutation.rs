//! Resumable permutation cursor
//!
//! Iterative Heap's algorithm with its swap counters kept in the struct, so
//! enumeration can stop after any permutation and pick up again later without
//! a call stack to rebuild.

/// Cursor over every arrangement of a buffer
#[derive(Debug, Clone)]
pub struct HeapPermutations<T> {
    items: Vec<T>,
    counters: Vec<usize>,
    level: usize,
    started: bool,
    done: bool,
}

impl<T: Copy> HeapPermutations<T> {
    /// Start a cursor over `items`; the first permutation is `items` itself
    pub fn new(items: Vec<T>) -> Self {
        let n = items.len();
        Self {
            items,
            counters: vec![0; n],
            level: 1,
            started: false,
            done: false,
        }
    }

    /// Current arrangement of the buffer
    pub fn current(&self) -> &[T] {
        &self.items
    }

    /// Advance to the next arrangement, or `None` once all `n!` have been produced
    pub fn next_permutation(&mut self) -> Option<&[T]> {
        if self.done {
            return None;
        }
        if !self.started {
            self.started = true;
            return Some(&self.items);
        }

        let n = self.items.len();
        while self.level < n {
            let i = self.level;
            if self.counters[i] < i {
                if i % 2 == 0 {
                    self.items.swap(0, i);
                } else {
                    self.items.swap(self.counters[i], i);
                }
                self.counters[i] += 1;
                self.level = 1;
                return Some(&self.items);
            }
            self.counters[i] = 0;
            self.level += 1;
        }

        self.done = true;
        None
    }
}
