//! In-memory plant store with change notification.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt};
use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::debug;

use super::{PlantStore, PlantStream, StoreError};
use crate::model::Plant;

type RowFilter = Arc<dyn Fn(&Plant) -> bool + Send + Sync>;

/// Plant store held entirely in memory.
///
/// Rows are keyed by `plant_id`. Every successful `insert_all` bumps a
/// revision counter on a `watch` channel; query streams wait on that channel
/// and re-read their rows when it moves. Snapshots are ordered by name.
///
/// Change notifications coalesce: a stream that falls behind sees the latest
/// snapshot, not every intermediate one.
pub struct MemoryPlantStore {
    rows: Arc<RwLock<BTreeMap<String, Plant>>>,
    revision: watch::Sender<u64>,
}

impl Default for MemoryPlantStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPlantStore {
    /// Create an empty store.
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            rows: Arc::new(RwLock::new(BTreeMap::new())),
            revision,
        }
    }

    /// Create a store pre-populated with `plants`.
    pub fn with_plants(plants: impl IntoIterator<Item = Plant>) -> Self {
        let store = Self::new();
        {
            let mut rows = store.rows.write();
            for plant in plants {
                rows.insert(plant.plant_id.clone(), plant);
            }
        }
        store
    }

    /// Number of stored plants.
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// Returns true if the store holds no plants.
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    /// Current revision; increases by one per successful insert.
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    fn query(&self, filter: RowFilter) -> PlantStream {
        let mut changes = self.revision.subscribe();
        changes.borrow_and_update();
        let rows = Arc::clone(&self.rows);

        stream::unfold(
            (changes, true, filter),
            move |(mut changes, first, filter)| {
                let rows = Arc::clone(&rows);
                async move {
                    if !first {
                        // Sender dropped: the store is gone, end the stream.
                        changes.changed().await.ok()?;
                        changes.borrow_and_update();
                    }
                    let snapshot = snapshot(&rows, filter.as_ref());
                    Some((snapshot, (changes, false, filter)))
                }
            },
        )
        .boxed()
    }
}

fn snapshot(
    rows: &RwLock<BTreeMap<String, Plant>>,
    filter: &(dyn Fn(&Plant) -> bool + Send + Sync),
) -> Vec<Plant> {
    let mut plants: Vec<Plant> = rows
        .read()
        .values()
        .filter(|plant| filter(*plant))
        .cloned()
        .collect();
    plants.sort_by(|a, b| a.name.cmp(&b.name));
    plants
}

impl PlantStore for MemoryPlantStore {
    fn plants(&self) -> PlantStream {
        self.query(Arc::new(|_: &Plant| true))
    }

    fn plants_with_grow_zone(&self, grow_zone_number: i32) -> PlantStream {
        self.query(Arc::new(move |plant: &Plant| {
            plant.grow_zone_number == grow_zone_number
        }))
    }

    fn insert_all(&self, plants: Vec<Plant>) -> BoxFuture<'_, Result<(), StoreError>> {
        async move {
            if let Some(bad) = plants.iter().find(|p| p.plant_id.trim().is_empty()) {
                return Err(StoreError::Rejected(format!(
                    "plant '{}' has an empty id",
                    bad.name
                )));
            }

            let count = plants.len();
            {
                let mut rows = self.rows.write();
                for plant in plants {
                    rows.insert(plant.plant_id.clone(), plant);
                }
            }
            self.revision.send_modify(|revision| *revision += 1);

            debug!(count, revision = self.revision(), "Inserted plants");
            Ok(())
        }
        .boxed()
    }
}
