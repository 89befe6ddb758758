// Identity-stabilizing cache - keeps returning the same Arc while deep equality holds
use std::collections::HashMap;
use std::sync::{Arc, Weak};

/// Dead fast-path entries are pruned once the set grows past this size.
const PRUNE_THRESHOLD: usize = 64;

/// Returns a stable `Arc` for as long as incoming values stay deep-equal to the
/// last accepted one.
///
/// Values already proven equal are remembered by pointer in a weak fast-path set,
/// so passing the same upstream `Arc` every frame skips the deep comparison. The
/// set holds `Weak` handles only and never keeps a value alive.
///
/// Invariant: every live entry in the fast-path set points to a value deep-equal
/// to `current`. The set is replaced wholesale whenever `current` changes.
#[derive(Debug)]
pub struct DeepMemo<T> {
    current: Option<Arc<T>>,
    equal_copies: HashMap<usize, Weak<T>>,
}

impl<T> Default for DeepMemo<T> {
    fn default() -> Self {
        Self {
            current: None,
            equal_copies: HashMap::new(),
        }
    }
}

impl<T: PartialEq> DeepMemo<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absent values pass through and are never cached.
    pub fn stabilize(&mut self, value: Option<Arc<T>>) -> Option<Arc<T>> {
        value.map(|v| self.stabilize_arc(v))
    }

    pub fn stabilize_arc(&mut self, value: Arc<T>) -> Arc<T> {
        if let Some(current) = &self.current {
            if self.is_known_copy(&value) {
                return Arc::clone(current);
            }

            if current.as_ref() == value.as_ref() {
                let current = Arc::clone(current);
                self.remember(&value);
                return current;
            }
        }

        tracing::debug!("deep memo accepted a new value");
        self.equal_copies = HashMap::new();
        self.remember(&value);
        self.current = Some(Arc::clone(&value));
        value
    }

    pub fn current(&self) -> Option<&Arc<T>> {
        self.current.as_ref()
    }

    pub fn reset(&mut self) {
        self.current = None;
        self.equal_copies = HashMap::new();
    }

    fn is_known_copy(&self, value: &Arc<T>) -> bool {
        self.equal_copies
            .get(&identity(value))
            .is_some_and(|weak| weak.strong_count() > 0 && std::ptr::eq(weak.as_ptr(), Arc::as_ptr(value)))
    }

    fn remember(&mut self, value: &Arc<T>) {
        if self.equal_copies.len() >= PRUNE_THRESHOLD {
            self.equal_copies.retain(|_, weak| weak.strong_count() > 0);
        }
        self.equal_copies.insert(identity(value), Arc::downgrade(value));
    }

    #[cfg(test)]
    fn fast_path_len(&self) -> usize {
        self.equal_copies.len()
    }
}

fn identity<T>(value: &Arc<T>) -> usize {
    Arc::as_ptr(value) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Tags {
        names: Vec<String>,
    }

    fn tags(names: &[&str]) -> Arc<Tags> {
        Arc::new(Tags {
            names: names.iter().map(|n| n.to_string()).collect(),
        })
    }

    #[test]
    fn test_absent_value_is_not_cached() {
        let mut memo: DeepMemo<Tags> = DeepMemo::new();
        assert!(memo.stabilize(None).is_none());
        assert!(memo.current().is_none());
    }

    #[test]
    fn test_same_value_twice_is_identical() {
        let mut memo = DeepMemo::new();
        let v = tags(&["a"]);
        let first = memo.stabilize_arc(Arc::clone(&v));
        let second = memo.stabilize_arc(Arc::clone(&v));
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first, &v));
    }

    #[test]
    fn test_deep_equal_copies_converge() {
        let mut memo = DeepMemo::new();
        let v1 = tags(&["a", "b"]);
        let v2 = tags(&["a", "b"]);

        let first = memo.stabilize_arc(Arc::clone(&v1));
        let second = memo.stabilize_arc(Arc::clone(&v2));
        assert!(Arc::ptr_eq(&first, &v1));
        assert!(Arc::ptr_eq(&second, &v1));
        assert_eq!(memo.fast_path_len(), 2);

        // v2 is now on the fast path
        let third = memo.stabilize_arc(Arc::clone(&v2));
        assert!(Arc::ptr_eq(&third, &v1));
    }

    #[test]
    fn test_change_clears_fast_path() {
        let mut memo = DeepMemo::new();
        let v1 = tags(&["a"]);
        let v2 = tags(&["b"]);
        let v1b = tags(&["a"]);

        memo.stabilize_arc(Arc::clone(&v1));
        let accepted = memo.stabilize_arc(Arc::clone(&v2));
        assert!(Arc::ptr_eq(&accepted, &v2));
        assert_eq!(memo.fast_path_len(), 1);

        let after = memo.stabilize_arc(Arc::clone(&v1b));
        assert!(Arc::ptr_eq(&after, &v1b));
        assert!(!Arc::ptr_eq(&after, &v1));
    }

    #[test]
    fn test_previously_fast_pathed_value_misses_after_reset() {
        let mut memo = DeepMemo::new();
        let v1 = tags(&["a"]);
        let copy = tags(&["a"]);
        let v2 = tags(&["b"]);

        memo.stabilize_arc(Arc::clone(&v1));
        memo.stabilize_arc(Arc::clone(&copy));
        memo.stabilize_arc(Arc::clone(&v2));

        // `copy` was on the fast path for v1; after the change it must be compared again
        let result = memo.stabilize_arc(Arc::clone(&copy));
        assert!(Arc::ptr_eq(&result, &copy));
        assert!(Arc::ptr_eq(memo.current().unwrap(), &copy));
    }

    #[test]
    fn test_fast_path_does_not_keep_values_alive() {
        let mut memo = DeepMemo::new();
        let v1 = tags(&["a"]);
        let copy = tags(&["a"]);
        let weak_copy = Arc::downgrade(&copy);

        memo.stabilize_arc(Arc::clone(&v1));
        memo.stabilize_arc(copy);
        assert!(weak_copy.upgrade().is_none());
    }

    #[test]
    fn test_reset_forgets_everything() {
        let mut memo = DeepMemo::new();
        let v1 = tags(&["a"]);
        memo.stabilize_arc(Arc::clone(&v1));
        memo.reset();
        assert!(memo.current().is_none());

        let v1b = tags(&["a"]);
        let result = memo.stabilize_arc(Arc::clone(&v1b));
        assert!(Arc::ptr_eq(&result, &v1b));
    }
}
