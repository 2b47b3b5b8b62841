//! Sorted plant list that follows the active filter.
//!
//! [`SwitchingFeed`] turns a resolver (`FilterKey -> PlantStream`) and the
//! sort order cache into one observable list. [`apply_sort`] and
//! [`SortRanks`] hold the ordering rule on their own so it can be reused and
//! tested without streams.

mod sort;
mod switching;

pub use sort::{apply_sort, SortRanks};
pub use switching::{SortOrderCache, SourceResolver, SwitchingFeed};
