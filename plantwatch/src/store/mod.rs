//! Local plant store.
//!
//! The store is the source of truth the plant list observes. Queries return
//! reactive streams that yield the current matching rows and then a fresh
//! snapshot whenever the underlying data changes. Refreshes write into the
//! store with [`PlantStore::insert_all`]; they never push to observers
//! directly.
//!
//! # Implementations
//!
//! - [`MemoryPlantStore`] - in-process store backed by a `BTreeMap` and a
//!   `tokio::sync::watch` revision counter

mod memory;

pub use memory::MemoryPlantStore;

use futures::future::BoxFuture;
use futures::stream::BoxStream;
use thiserror::Error;

use crate::model::Plant;

/// Reactive query result: one `Vec<Plant>` per change.
pub type PlantStream = BoxStream<'static, Vec<Plant>>;

/// Errors that can occur when writing to the store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A row failed validation.
    #[error("Rejected plant: {0}")]
    Rejected(String),

    /// The backing storage cannot be reached. `MemoryPlantStore` never
    /// returns this; it is for persistent backends.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Storage for plants with reactive queries.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the store is shared between the
/// refresh path and any number of query streams.
pub trait PlantStore: Send + Sync {
    /// All plants, re-emitted on every change.
    fn plants(&self) -> PlantStream;

    /// Plants in `grow_zone_number`, re-emitted on every change.
    fn plants_with_grow_zone(&self, grow_zone_number: i32) -> PlantStream;

    /// Insert plants, replacing existing rows with the same `plant_id`.
    fn insert_all(&self, plants: Vec<Plant>) -> BoxFuture<'_, Result<(), StoreError>>;
}
