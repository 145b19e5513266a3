//! Lock-free work queue handing out positions of a batch to concurrent workers

use std::sync::atomic::{AtomicUsize, Ordering};

/// Queue over a borrowed slice; every position is claimed exactly once.
///
/// Workers call [`claim()`](WorkQueue::claim) to atomically take the next
/// position. The position travels with the item so results can be written
/// back into an index-addressed slot array.
pub struct WorkQueue<'a, T> {
    items: &'a [T],
    cursor: AtomicUsize,
}

impl<'a, T> WorkQueue<'a, T> {
    pub fn new(items: &'a [T]) -> Self {
        Self {
            items,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Claim the next unprocessed item with its position (lock-free)
    pub fn claim(&self) -> Option<(usize, &'a T)> {
        let i = self.cursor.fetch_add(1, Ordering::Relaxed);
        self.items.get(i).map(|item| (i, item))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claims_in_order_with_positions() {
        let items = ["a", "b", "c"];
        let q = WorkQueue::new(&items);
        assert_eq!(q.claim(), Some((0, &"a")));
        assert_eq!(q.claim(), Some((1, &"b")));
        assert_eq!(q.claim(), Some((2, &"c")));
        assert_eq!(q.claim(), None);
        // Exhausted queue stays exhausted
        assert_eq!(q.claim(), None);
    }

    #[test]
    fn empty_queue() {
        let items: [i32; 0] = [];
        let q = WorkQueue::new(&items);
        assert_eq!(q.claim(), None);
    }

    #[test]
    fn concurrent_claims_are_unique() {
        let items: Vec<usize> = (0..1000).collect();
        let q = WorkQueue::new(&items);
        let seen = std::sync::Mutex::new(Vec::new());
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    while let Some((pos, _)) = q.claim() {
                        seen.lock().unwrap().push(pos);
                    }
                });
            }
        });
        let mut seen = seen.into_inner().unwrap();
        seen.sort_unstable();
        assert_eq!(seen, items);
    }
}
