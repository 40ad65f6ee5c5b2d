// SPDX-License-Identifier: MIT OR Apache-2.0
//! Process-wide identity allocation.
//!
//! Every entity in a document gets a `u64` id from one global counter. Ids are
//! never zero and never handed out twice within a process. Ids read back from
//! disk are reported through [`observe`] so later allocations skip past them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Largest id accepted from disk
///
/// Keeps half of the id space free for allocation after a load.
pub const MAX_STORED_ID: u64 = u64::MAX >> 1;

/// Allocate a fresh raw id.
///
/// # Panics
///
/// Panics if the id space is exhausted rather than wrapping to reused ids.
pub fn allocate() -> u64 {
    match NEXT_ID.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |next| next.checked_add(1)) {
        Ok(id) => id,
        Err(_) => panic!("id space exhausted"),
    }
}

/// Whether a raw id read from disk can be kept as is
pub fn is_storable(raw: u64) -> bool {
    (1..=MAX_STORED_ID).contains(&raw)
}

/// Make sure future allocations are strictly greater than `raw`.
///
/// Ids outside the storable range are ignored.
pub fn observe(raw: u64) {
    if is_storable(raw) {
        NEXT_ID.fetch_max(raw + 1, Ordering::Relaxed);
    }
}

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Allocate a new unique id
            pub fn new() -> Self {
                Self(allocate())
            }

            /// Get the raw id value
            pub fn value(&self) -> u64 {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

entity_id!(
    /// Unique identifier for a node
    NodeId,
    "node"
);
entity_id!(
    /// Unique identifier for a port
    PortId,
    "port"
);
entity_id!(
    /// Unique identifier for a pipe
    PipeId,
    "pipe"
);
entity_id!(
    /// Unique identifier for a graph document
    DocumentId,
    "document"
);
entity_id!(
    /// Unique identifier for a leaf cell (file, todo, embedded view)
    LeafId,
    "leaf"
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_are_unique_and_nonzero() {
        let mut seen = HashSet::new();
        for _ in 0..1000 {
            let a = NodeId::new().value();
            let b = PortId::new().value();
            let c = PipeId::new().value();
            assert!(a != 0 && b != 0 && c != 0);
            assert!(seen.insert(a));
            assert!(seen.insert(b));
            assert!(seen.insert(c));
        }
    }

    #[test]
    fn test_observe_skips_loaded_ids() {
        let far = allocate() + 10_000;
        observe(far);
        assert!(allocate() > far);
        // Observing a smaller id never moves the counter backwards
        let next = allocate();
        observe(1);
        assert!(allocate() > next);
    }

    #[test]
    fn test_out_of_range_ids_do_not_move_counter() {
        assert!(!is_storable(0));
        assert!(!is_storable(u64::MAX));
        assert!(is_storable(MAX_STORED_ID));
        observe(u64::MAX);
        let a = allocate();
        let b = allocate();
        assert!(b > a);
        assert_ne!(a, u64::MAX);
    }
}
