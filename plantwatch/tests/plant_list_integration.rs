//! Integration tests for the plant list.
//!
//! These tests drive a [`PlantListController`] over a real
//! [`MemoryPlantStore`] and a scripted catalogue and verify:
//! - refresh → store → feed → sorted list
//! - filter switching without stale lists
//! - shared, retryable sort order fetches
//! - spinner and error reporting alongside the data stream
//!
//! Run with: `cargo test --test plant_list_integration`

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use tokio::runtime::Handle;

use plantwatch::observable::Subscription;
use plantwatch::service::{PlantService, ServiceError};
use plantwatch::store::MemoryPlantStore;
use plantwatch::{
    FilterKey, LoadState, Plant, PlantListController, PlantRepository, TrackedOutcome,
};

// ============================================================================
// Helper Functions
// ============================================================================

/// Catalogue that answers from settable results and counts calls.
struct ScriptedCatalogue {
    plants: Mutex<Result<Vec<Plant>, ServiceError>>,
    sort_order: Mutex<Result<Vec<String>, ServiceError>>,
    sort_order_delay: Duration,
    plant_calls: AtomicUsize,
    sort_order_calls: AtomicUsize,
}

impl ScriptedCatalogue {
    fn new(sort_order: &[&str]) -> Self {
        Self {
            plants: Mutex::new(Ok(garden())),
            sort_order: Mutex::new(Ok(sort_order.iter().map(|s| s.to_string()).collect())),
            sort_order_delay: Duration::ZERO,
            plant_calls: AtomicUsize::new(0),
            sort_order_calls: AtomicUsize::new(0),
        }
    }

    fn with_sort_order_delay(mut self, delay: Duration) -> Self {
        self.sort_order_delay = delay;
        self
    }
}

impl PlantService for ScriptedCatalogue {
    fn all_plants(&self) -> BoxFuture<'_, Result<Vec<Plant>, ServiceError>> {
        async move {
            self.plant_calls.fetch_add(1, Ordering::SeqCst);
            self.plants.lock().clone()
        }
        .boxed()
    }

    fn plants_by_grow_zone(
        &self,
        grow_zone_number: i32,
    ) -> BoxFuture<'_, Result<Vec<Plant>, ServiceError>> {
        async move {
            let plants = self.all_plants().await?;
            Ok(plants
                .into_iter()
                .filter(|p| p.grow_zone_number == grow_zone_number)
                .collect())
        }
        .boxed()
    }

    fn custom_plant_sort_order(&self) -> BoxFuture<'_, Result<Vec<String>, ServiceError>> {
        async move {
            self.sort_order_calls.fetch_add(1, Ordering::SeqCst);
            if !self.sort_order_delay.is_zero() {
                tokio::time::sleep(self.sort_order_delay).await;
            }
            self.sort_order.lock().clone()
        }
        .boxed()
    }
}

/// A small catalogue across three grow zones.
fn garden() -> Vec<Plant> {
    vec![
        Plant::new("malus-pumila", "Apple", 3),
        Plant::new("beta-vulgaris", "Beet", 2),
        Plant::new("coriandrum-sativum", "Cilantro", 2),
        Plant::new("solanum-lycopersicum", "Tomato", 9),
        Plant::new("persea-americana", "Avocado", 9),
    ]
}

fn setup(catalogue: ScriptedCatalogue) -> (PlantListController, Arc<ScriptedCatalogue>) {
    let catalogue = Arc::new(catalogue);
    let store = Arc::new(MemoryPlantStore::new());
    let repository = Arc::new(PlantRepository::new(store, catalogue.clone()));
    let controller = PlantListController::new(repository, Handle::current());
    (controller, catalogue)
}

fn ids(plants: &[Plant]) -> Vec<&str> {
    plants.iter().map(|p| p.plant_id.as_str()).collect()
}

/// Wait until the list subscription yields exactly `expected` ids.
async fn expect_list(plants: &mut Subscription<Vec<Plant>>, expected: &[&str]) {
    let result = tokio::time::timeout(Duration::from_secs(2), async {
        let mut seen = Vec::new();
        while let Some(list) = plants.recv().await {
            if ids(&list) == expected {
                return;
            }
            seen.push(ids(&list).join(","));
        }
        panic!("feed closed; saw {seen:?}");
    })
    .await;
    assert!(result.is_ok(), "list never became {expected:?}");
}

// ============================================================================
// Integration Tests
// ============================================================================

/// The unfiltered list appears in custom order, unranked plants after by name.
#[tokio::test]
async fn test_initial_list_uses_custom_order() {
    let (controller, _) = setup(ScriptedCatalogue::new(&[
        "solanum-lycopersicum",
        "beta-vulgaris",
    ]));
    let mut plants = controller.observe_sorted_plants();

    expect_list(
        &mut plants,
        &[
            "solanum-lycopersicum",
            "beta-vulgaris",
            "malus-pumila",
            "persea-americana",
            "coriandrum-sativum",
        ],
    )
    .await;
}

/// Switching zones only ever shows plants from the active zone.
#[tokio::test]
async fn test_zone_switching_shows_only_active_zone() {
    let (controller, _) = setup(ScriptedCatalogue::new(&[]));

    controller.set_grow_zone_number(2).wait().await;
    controller.set_grow_zone_number(9).wait().await;

    let mut plants = controller.observe_sorted_plants();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let list = tokio::time::timeout_at(deadline, plants.recv())
            .await
            .expect("zone 9 list never arrived")
            .expect("feed closed");
        assert!(
            list.iter().all(|p| p.grow_zone_number == 9),
            "stale list leaked: {:?}",
            ids(&list)
        );
        if ids(&list) == ["persea-americana", "solanum-lycopersicum"] {
            break;
        }
    }
    assert_eq!(controller.filter_key(), FilterKey::Zone(9));
}

/// Clearing the filter returns to the full list.
#[tokio::test]
async fn test_clear_filter_restores_full_list() {
    let (controller, _) = setup(ScriptedCatalogue::new(&[]));
    controller.set_grow_zone_number(3).wait().await;
    assert!(controller.is_filtered());

    controller.clear_filter_key().wait().await;

    assert!(!controller.is_filtered());
    let mut plants = controller.observe_sorted_plants();
    expect_list(
        &mut plants,
        &[
            "malus-pumila",
            "persea-americana",
            "beta-vulgaris",
            "coriandrum-sativum",
            "solanum-lycopersicum",
        ],
    )
    .await;
}

/// A failed refresh raises an error while the list stays as it was.
#[tokio::test]
async fn test_failed_refresh_reports_error_and_keeps_list() {
    let (controller, catalogue) = setup(ScriptedCatalogue::new(&[]));
    let mut plants = controller.observe_sorted_plants();
    expect_list(
        &mut plants,
        &[
            "malus-pumila",
            "persea-americana",
            "beta-vulgaris",
            "coriandrum-sativum",
            "solanum-lycopersicum",
        ],
    )
    .await;

    *catalogue.plants.lock() = Err(ServiceError::Http("connection reset".into()));
    let mut states = controller.observe_load_state();
    tokio::time::timeout(Duration::from_secs(2), async {
        while states.recv().await != Some(LoadState::Idle) {}
    })
    .await
    .expect("initial refresh never settled");

    let outcome = controller.refresh(FilterKey::Unfiltered).wait().await;

    assert_eq!(
        outcome,
        TrackedOutcome::Failed("Request failed: connection reset".into())
    );
    assert_eq!(
        states.drain(),
        vec![
            LoadState::Loading,
            LoadState::Error("Request failed: connection reset".into())
        ]
    );
    assert_eq!(controller.sorted_plants().map(|l| l.len()), Some(5));

    assert!(controller.dismiss_error());
    assert_eq!(states.drain(), vec![LoadState::Idle]);
    assert!(!controller.dismiss_error());
}

/// Concurrent feeds over one repository share a single sort order fetch.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sort_order_fetched_once_across_controllers() {
    let catalogue = Arc::new(
        ScriptedCatalogue::new(&["persea-americana"]).with_sort_order_delay(Duration::from_millis(50)),
    );
    let store = Arc::new(MemoryPlantStore::new());
    let repository = Arc::new(PlantRepository::new(store, catalogue.clone()));

    let controllers: Vec<_> = (0..4)
        .map(|_| PlantListController::new(repository.clone(), Handle::current()))
        .collect();

    for controller in &controllers {
        let mut plants = controller.observe_sorted_plants();
        let result = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                let list = plants.recv().await.expect("feed closed");
                if list.len() == 5 {
                    return list;
                }
            }
        })
        .await
        .expect("full list never arrived");
        assert_eq!(result[0].plant_id, "persea-americana");
    }

    assert_eq!(catalogue.sort_order_calls.load(Ordering::SeqCst), 1);
}

/// A failed sort order fetch falls back to name order and is retried later.
#[tokio::test]
async fn test_sort_order_failure_is_retried_on_next_switch() {
    let catalogue = ScriptedCatalogue::new(&[]);
    *catalogue.sort_order.lock() = Err(ServiceError::Http("offline".into()));
    let (controller, catalogue) = setup(catalogue);

    controller.set_grow_zone_number(9).wait().await;
    let mut plants = controller.observe_sorted_plants();
    expect_list(&mut plants, &["persea-americana", "solanum-lycopersicum"]).await;

    *catalogue.sort_order.lock() = Ok(vec!["solanum-lycopersicum".to_string()]);
    controller.set_grow_zone_number(2).wait().await;
    controller.set_grow_zone_number(9).wait().await;

    let mut plants = controller.observe_sorted_plants();
    expect_list(&mut plants, &["solanum-lycopersicum", "persea-americana"]).await;
    assert!(catalogue.sort_order_calls.load(Ordering::SeqCst) >= 2);
}

/// With refresh disabled the list shows what the store already holds.
#[tokio::test]
async fn test_disabled_refresh_uses_existing_rows() {
    let catalogue = Arc::new(ScriptedCatalogue::new(&[]));
    let store = Arc::new(MemoryPlantStore::with_plants(vec![Plant::new(
        "helianthus-annuus",
        "Sunflower",
        4,
    )]));
    let repository = Arc::new(
        PlantRepository::new(store, catalogue.clone()).with_refresh_enabled(false),
    );
    let controller = PlantListController::new(repository, Handle::current());

    let mut plants = controller.observe_sorted_plants();
    expect_list(&mut plants, &["helianthus-annuus"]).await;

    let outcome = controller.refresh(FilterKey::Unfiltered).wait().await;
    assert!(outcome.is_completed());
    assert_eq!(catalogue.plant_calls.load(Ordering::SeqCst), 0);
}
