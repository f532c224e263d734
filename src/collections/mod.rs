//! In-memory record containers shared by the managers

pub mod indexed;
pub mod sort;
pub mod wait_queue;

pub use indexed::{binary_search_sorted, IndexedCollection};
pub use sort::{quick_sort, sort_by, SortOrder};
pub use wait_queue::WaitQueue;

/// A record addressable by a unique key.
///
/// `hash_key` must be a pure function of the key.
pub trait Keyed {
    type Key: ?Sized + Eq;

    fn key(&self) -> &Self::Key;

    fn hash_key(key: &Self::Key) -> u64;
}

/// djb2 string hash (`h * 33 + byte`, seeded with 5381)
pub fn djb2(key: &str) -> u64 {
    key.bytes().fold(5381u64, |hash, byte| {
        (hash << 5).wrapping_add(hash).wrapping_add(u64::from(byte))
    })
}
