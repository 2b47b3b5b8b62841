//! Custom sort order applied to plant lists.
//!
//! Plants whose id appears in the sort order come first, in the order the
//! ids appear. Everything else follows, ordered by name. Equal keys keep
//! their incoming order.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::model::Plant;

/// Rank lookup built once per sort order.
///
/// An id listed more than once keeps its first position.
#[derive(Debug, Clone, Default)]
pub struct SortRanks {
    ranks: HashMap<String, usize>,
}

impl SortRanks {
    /// Build ranks from an ordered list of plant ids.
    pub fn new(sort_order: &[String]) -> Self {
        let mut ranks = HashMap::with_capacity(sort_order.len());
        for (position, id) in sort_order.iter().enumerate() {
            ranks.entry(id.clone()).or_insert(position);
        }
        Self { ranks }
    }

    /// Position of `plant_id` in the order, if listed.
    pub fn rank(&self, plant_id: &str) -> Option<usize> {
        self.ranks.get(plant_id).copied()
    }

    /// Compare two plants by (rank, name); unranked sorts last.
    pub fn compare(&self, a: &Plant, b: &Plant) -> Ordering {
        let rank_a = self.rank(&a.plant_id).unwrap_or(usize::MAX);
        let rank_b = self.rank(&b.plant_id).unwrap_or(usize::MAX);
        rank_a.cmp(&rank_b).then_with(|| a.name.cmp(&b.name))
    }

    /// Sort `plants` in place. Stable.
    pub fn sort(&self, plants: &mut [Plant]) {
        plants.sort_by(|a, b| self.compare(a, b));
    }
}

/// Return `plants` ordered by `sort_order`, then by name.
pub fn apply_sort(mut plants: Vec<Plant>, sort_order: &[String]) -> Vec<Plant> {
    SortRanks::new(sort_order).sort(&mut plants);
    plants
}
