//! Consumer-facing plant list.
//!
//! [`PlantListController`] is what a front end holds. It combines the
//! [`SwitchingFeed`] (what to show) with the [`LoadCoordinator`] (whether to
//! show a spinner or an error) and routes filter changes to both.
//!
//! # Architecture
//!
//! ```text
//!                  set_filter_key(k)
//!                         │
//!            ┌────────────┴────────────┐
//!            ▼                         ▼
//!     SwitchingFeed.set_key(k)   LoadCoordinator.run_tracked(
//!            │                       repository.refresh(k))
//!            ▼                         │
//!   store query for k ◄── insert_all ──┘
//!            │
//!            ▼
//!   sorted Vec<Plant> ──► observe_sorted_plants()
//! ```
//!
//! The list and the load state are independent: a failed refresh shows an
//! error but the last list stays on screen.

use std::fmt;
use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::debug;

use crate::feed::SwitchingFeed;
use crate::load::{LoadCoordinator, LoadHandle, LoadState};
use crate::model::{FilterKey, Plant};
use crate::observable::Subscription;
use crate::repository::PlantRepository;

/// Filterable, sorted plant list with refresh tracking.
pub struct PlantListController {
    repository: Arc<PlantRepository>,
    feed: SwitchingFeed,
    loads: LoadCoordinator,
}

impl fmt::Debug for PlantListController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlantListController")
            .field("feed", &self.feed)
            .field("loads", &self.loads)
            .finish_non_exhaustive()
    }
}

impl PlantListController {
    /// Create a controller showing every plant.
    ///
    /// Starts a tracked refresh of the unfiltered list, so observers see
    /// `Loading` right away.
    ///
    /// # Arguments
    ///
    /// * `repository` - Source of store queries, refreshes and sort order
    /// * `runtime` - Runtime the feed pump and refresh tasks run on
    pub fn new(repository: Arc<PlantRepository>, runtime: Handle) -> Self {
        let feed = SwitchingFeed::new(
            repository.resolver(),
            repository.sort_order_cache(),
            runtime.clone(),
        );
        let controller = Self {
            repository,
            feed,
            loads: LoadCoordinator::new(runtime),
        };
        controller.clear_filter_key();
        controller
    }

    /// Show plants for `key` and refresh them from the catalogue.
    ///
    /// The refresh runs even if `key` is already active.
    pub fn set_filter_key(&self, key: FilterKey) -> LoadHandle {
        if !self.feed.set_key(key) {
            debug!(key = %key, "Filter key unchanged, refreshing only");
        }
        self.refresh(key)
    }

    /// Show plants for one grow zone.
    pub fn set_grow_zone_number(&self, grow_zone_number: i32) -> LoadHandle {
        self.set_filter_key(FilterKey::Zone(grow_zone_number))
    }

    /// Show every plant.
    pub fn clear_filter_key(&self) -> LoadHandle {
        self.set_filter_key(FilterKey::Unfiltered)
    }

    /// The active filter key.
    pub fn filter_key(&self) -> FilterKey {
        self.feed.current_key().unwrap_or_default()
    }

    /// Returns true if a grow zone filter is active.
    pub fn is_filtered(&self) -> bool {
        self.filter_key().is_filtered()
    }

    /// Observe the sorted list for the active key.
    pub fn observe_sorted_plants(&self) -> Subscription<Vec<Plant>> {
        self.feed.subscribe()
    }

    /// The most recent sorted list, if one has been emitted for this key.
    pub fn sorted_plants(&self) -> Option<Vec<Plant>> {
        self.feed.latest()
    }

    /// Observe spinner and error state.
    pub fn observe_load_state(&self) -> Subscription<LoadState> {
        self.loads.subscribe()
    }

    /// Current load state.
    pub fn load_state(&self) -> LoadState {
        self.loads.state()
    }

    /// Clear a shown error. Returns true if there was one.
    pub fn dismiss_error(&self) -> bool {
        self.loads.dismiss_error()
    }

    /// Refresh the plants for `key` with load tracking.
    pub fn refresh(&self, key: FilterKey) -> LoadHandle {
        let repository = Arc::clone(&self.repository);
        self.loads
            .run_tracked(async move { repository.refresh(key).await.map(|_| ()) })
    }
}
