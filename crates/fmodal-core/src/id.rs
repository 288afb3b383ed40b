#![forbid(unsafe_code)]

//! Modal instance identifiers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for unique modal IDs.
static MODAL_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a modal instance.
///
/// IDs come from a process-wide atomic counter, so two opens in the same
/// scheduling tick (or on different registries) never collide, and an ID is
/// never handed out twice. IDs also order by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModalId(u64);

impl ModalId {
    /// Allocate a new unique modal ID.
    #[must_use]
    pub fn next() -> Self {
        Self(MODAL_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    #[inline]
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ModalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "modal-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn ids_are_strictly_increasing() {
        let a = ModalId::next();
        let b = ModalId::next();
        assert!(b > a);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn ids_unique_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| thread::spawn(|| (0..256).map(|_| ModalId::next()).collect::<Vec<_>>()))
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().expect("id thread panicked") {
                assert!(seen.insert(id), "duplicate id {id}");
            }
        }
        assert_eq!(seen.len(), 4 * 256);
    }

    #[test]
    fn display_format() {
        let id = ModalId(7);
        assert_eq!(id.to_string(), "modal-7");
    }
}
