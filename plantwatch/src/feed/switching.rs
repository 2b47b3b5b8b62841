//! Upstream-switching plant feed.
//!
//! `SwitchingFeed` owns at most one live upstream query at a time. Changing
//! the key cancels the running pump (which drops its upstream stream) and
//! starts a new one for the new key. Every emission is sorted with the cached
//! custom order before it is published.
//!
//! # Switch Sequence
//!
//! ```text
//! set_key(k) ── lock switch state
//!              ├─ same key? ──► no-op
//!              ├─ upstream = resolver(k)
//!              ├─ cancel old pump, bump generation, clear last value
//!              └─ spawn pump(upstream, generation)
//!
//! pump ── order = cache.get_or_await()          (once per key)
//!      └─ for each emission: sort ─► lock switch state
//!                                     └─ generation current? ──► publish
//! ```
//!
//! Publishing under the switch lock with a generation check is what keeps a
//! superseded pump from delivering anything once a switch has started.

use std::fmt;
use std::sync::Arc;

use futures::StreamExt;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::sort::SortRanks;
use crate::cache::CacheOnSuccess;
use crate::model::{FilterKey, Plant};
use crate::observable::{Publisher, Subscription};
use crate::store::PlantStream;

/// Maps a filter key to the upstream query for it.
pub type SourceResolver = Arc<dyn Fn(FilterKey) -> PlantStream + Send + Sync>;

/// Shared sort order cache.
pub type SortOrderCache = Arc<CacheOnSuccess<Vec<String>>>;

struct SwitchState {
    key: Option<FilterKey>,
    generation: u64,
    pump: Option<CancellationToken>,
}

/// Sorted plant list that follows the active filter key.
///
/// Assumes a single owner calls [`set_key`](Self::set_key); any number of
/// observers may [`subscribe`](Self::subscribe).
pub struct SwitchingFeed {
    resolver: SourceResolver,
    sort_order: SortOrderCache,
    output: Publisher<Vec<Plant>>,
    switch: Arc<Mutex<SwitchState>>,
    runtime: Handle,
}

impl fmt::Debug for SwitchingFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.switch.lock();
        f.debug_struct("SwitchingFeed")
            .field("key", &state.key)
            .field("generation", &state.generation)
            .field("sort_order", &self.sort_order)
            .finish_non_exhaustive()
    }
}

impl SwitchingFeed {
    /// Create a feed with no active key.
    ///
    /// # Arguments
    ///
    /// * `resolver` - Produces the upstream stream for a key
    /// * `sort_order` - Cache supplying the custom order
    /// * `runtime` - Runtime the pump tasks are spawned on
    pub fn new(resolver: SourceResolver, sort_order: SortOrderCache, runtime: Handle) -> Self {
        Self {
            resolver,
            sort_order,
            output: Publisher::new(),
            switch: Arc::new(Mutex::new(SwitchState {
                key: None,
                generation: 0,
                pump: None,
            })),
            runtime,
        }
    }

    /// Make `key` the active key.
    ///
    /// Returns false (and does nothing) if `key` is already active.
    pub fn set_key(&self, key: FilterKey) -> bool {
        let mut state = self.switch.lock();
        if state.key == Some(key) {
            return false;
        }

        let upstream = (self.resolver)(key);

        if let Some(previous) = state.pump.take() {
            previous.cancel();
        }
        state.generation += 1;
        state.key = Some(key);
        self.output.clear();

        let generation = state.generation;
        let cancellation = CancellationToken::new();
        self.runtime.spawn(pump(
            upstream,
            Arc::clone(&self.sort_order),
            self.output.clone(),
            Arc::clone(&self.switch),
            generation,
            cancellation.clone(),
        ));
        state.pump = Some(cancellation);

        debug!(key = %key, generation, "Switched plant feed upstream");
        true
    }

    /// The active key, if one has been set.
    pub fn current_key(&self) -> Option<FilterKey> {
        self.switch.lock().key
    }

    /// Observe sorted lists for the active key.
    ///
    /// The first value is the latest list for the current key, if one has
    /// been delivered since the last switch.
    pub fn subscribe(&self) -> Subscription<Vec<Plant>> {
        self.output.subscribe()
    }

    /// The most recent sorted list for the current key.
    pub fn latest(&self) -> Option<Vec<Plant>> {
        self.output.latest()
    }

    /// Number of attached observers.
    pub fn subscriber_count(&self) -> usize {
        self.output.subscriber_count()
    }
}

impl Drop for SwitchingFeed {
    fn drop(&mut self) {
        if let Some(pump) = self.switch.lock().pump.take() {
            pump.cancel();
        }
    }
}

/// Drive one upstream until it ends or is cancelled.
async fn pump(
    mut upstream: PlantStream,
    sort_order: SortOrderCache,
    output: Publisher<Vec<Plant>>,
    switch: Arc<Mutex<SwitchState>>,
    generation: u64,
    cancellation: CancellationToken,
) {
    let order = tokio::select! {
        biased;
        _ = cancellation.cancelled() => return,
        order = sort_order.get_or_await() => order,
    };
    let ranks = SortRanks::new(&order);

    loop {
        let mut plants = tokio::select! {
            biased;
            _ = cancellation.cancelled() => break,
            next = upstream.next() => match next {
                Some(plants) => plants,
                None => break,
            },
        };

        ranks.sort(&mut plants);

        let state = switch.lock();
        if state.generation != generation {
            break;
        }
        trace!(generation, count = plants.len(), "Publishing sorted plants");
        output.publish(plants);
    }

    debug!(generation, "Plant feed pump stopped");
}
