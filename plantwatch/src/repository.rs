//! Plant repository: the store, the remote catalogue and the sort order.
//!
//! The repository answers two questions for the rest of the crate:
//!
//! - **Which stream backs a filter key?** [`PlantRepository::plants_for`]
//!   maps `Unfiltered` to the full query and `Zone(n)` to the zone query.
//! - **How is the store refreshed?** [`PlantRepository::refresh`] fetches
//!   from the catalogue and writes into the store; observers pick up the
//!   change through their query streams.
//!
//! It also owns the custom sort order cache. The fallback for a failed
//! sort order fetch is an empty order, which makes the list sort by name.
//!
//! # Example
//!
//! ```ignore
//! let repository = Arc::new(PlantRepository::new(store, service));
//! repository.refresh(FilterKey::Zone(9)).await?;
//! let order = repository.custom_sort_order().await;
//! ```

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::cache::CacheOnSuccess;
use crate::feed::{SortOrderCache, SourceResolver};
use crate::model::{FilterKey, Plant};
use crate::service::{PlantService, ServiceError};
use crate::store::{PlantStore, PlantStream, StoreError};

/// Errors that can occur while refreshing the store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RefreshError {
    /// Fetching from the catalogue failed.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Writing to the store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of a successful refresh call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshReport {
    /// The cache policy said no fetch was needed.
    Skipped,
    /// This many plants were written to the store.
    Inserted(usize),
}

/// Coordinates the local store and the remote catalogue.
pub struct PlantRepository {
    store: Arc<dyn PlantStore>,
    service: Arc<dyn PlantService>,
    sort_order: SortOrderCache,
    refresh_enabled: bool,
}

impl PlantRepository {
    /// Create a repository over `store` and `service`.
    pub fn new(store: Arc<dyn PlantStore>, service: Arc<dyn PlantService>) -> Self {
        let sort_service = Arc::clone(&service);
        let sort_order = Arc::new(CacheOnSuccess::new(Vec::new, move || {
            let service = Arc::clone(&sort_service);
            async move { service.custom_plant_sort_order().await }
        }));

        Self {
            store,
            service,
            sort_order,
            refresh_enabled: true,
        }
    }

    /// Enable or disable network refreshes.
    ///
    /// When disabled, refresh calls succeed without fetching anything and
    /// the list shows whatever the store already holds.
    pub fn with_refresh_enabled(mut self, enabled: bool) -> Self {
        self.refresh_enabled = enabled;
        self
    }

    /// The shared custom sort order cache.
    pub fn sort_order_cache(&self) -> SortOrderCache {
        Arc::clone(&self.sort_order)
    }

    /// Custom sort order, fetched once and then cached.
    ///
    /// Returns an empty order if the fetch fails.
    pub async fn custom_sort_order(&self) -> Vec<String> {
        self.sort_order.get_or_await().await
    }

    /// Store query backing `key`.
    pub fn plants_for(&self, key: FilterKey) -> PlantStream {
        match key {
            FilterKey::Unfiltered => self.store.plants(),
            FilterKey::Zone(zone) => self.store.plants_with_grow_zone(zone),
        }
    }

    /// [`plants_for`](Self::plants_for) as a resolver for the feed.
    pub fn resolver(self: &Arc<Self>) -> SourceResolver {
        let repository = Arc::clone(self);
        Arc::new(move |key| repository.plants_for(key))
    }

    /// Whether a refresh should hit the network.
    pub fn should_update_plants_cache(&self) -> bool {
        self.refresh_enabled
    }

    /// Refresh the plants backing `key` from the catalogue.
    pub async fn refresh(&self, key: FilterKey) -> Result<RefreshReport, RefreshError> {
        match key {
            FilterKey::Unfiltered => self.try_update_recent_plants_cache().await,
            FilterKey::Zone(zone) => self.try_update_plants_for_grow_zone(zone).await,
        }
    }

    /// Fetch every plant and store it, if the cache policy allows.
    pub async fn try_update_recent_plants_cache(&self) -> Result<RefreshReport, RefreshError> {
        if !self.should_update_plants_cache() {
            debug!("Refresh disabled, skipping catalogue fetch");
            return Ok(RefreshReport::Skipped);
        }
        let plants = self.service.all_plants().await?;
        self.store_plants(plants, FilterKey::Unfiltered).await
    }

    /// Fetch one grow zone and store it, if the cache policy allows.
    pub async fn try_update_plants_for_grow_zone(
        &self,
        grow_zone_number: i32,
    ) -> Result<RefreshReport, RefreshError> {
        if !self.should_update_plants_cache() {
            debug!(zone = grow_zone_number, "Refresh disabled, skipping catalogue fetch");
            return Ok(RefreshReport::Skipped);
        }
        let plants = self.service.plants_by_grow_zone(grow_zone_number).await?;
        self.store_plants(plants, FilterKey::Zone(grow_zone_number))
            .await
    }

    async fn store_plants(
        &self,
        plants: Vec<Plant>,
        key: FilterKey,
    ) -> Result<RefreshReport, RefreshError> {
        let count = plants.len();
        self.store.insert_all(plants).await?;
        info!(key = %key, count, "Refreshed plants from catalogue");
        Ok(RefreshReport::Inserted(count))
    }
}
