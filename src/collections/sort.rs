//! In-place comparator quicksort.
//!
//! Lomuto partition with the last element as pivot. No median-of-three, so
//! already-sorted input degrades to O(n²) comparisons. The recursion always
//! descends into the smaller partition and loops over the larger one, which
//! bounds the stack at O(log n) frames without changing the comparison order.

use std::cmp::Ordering;

/// Sort order requested by callers of sorted views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    /// Apply the order to an ascending comparison
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    }
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Ascending),
            "desc" | "descending" => Ok(SortOrder::Descending),
            _ => Err(format!("Invalid sort order: {}", s)),
        }
    }
}

/// Sort `items` in place using the strict-weak-order predicate `less`.
///
/// Not stable: equal elements may be reordered.
pub fn quick_sort<T, F>(items: &mut [T], mut less: F)
where
    F: FnMut(&T, &T) -> bool,
{
    sort_range(items, &mut less);
}

fn sort_range<T, F>(mut items: &mut [T], less: &mut F)
where
    F: FnMut(&T, &T) -> bool,
{
    while items.len() > 1 {
        let pivot = partition(items, less);
        let (left, rest) = std::mem::take(&mut items).split_at_mut(pivot);
        let right = &mut rest[1..];
        if left.len() < right.len() {
            sort_range(left, less);
            items = right;
        } else {
            sort_range(right, less);
            items = left;
        }
    }
}

/// Lomuto partition around the last element; returns the pivot's final slot.
fn partition<T, F>(items: &mut [T], less: &mut F) -> usize
where
    F: FnMut(&T, &T) -> bool,
{
    let high = items.len() - 1;
    let mut store = 0;
    for j in 0..high {
        if less(&items[j], &items[high]) {
            items.swap(store, j);
            store += 1;
        }
    }
    items.swap(store, high);
    store
}

/// Convenience wrapper for `Ordering`-returning comparators
pub fn sort_by<T, F>(items: &mut [T], mut compare: F)
where
    F: FnMut(&T, &T) -> Ordering,
{
    quick_sort(items, |a, b| compare(a, b) == Ordering::Less);
}
