//! Single-flight memoizing cache that only remembers successes.
//!
//! `CacheOnSuccess` holds one derived value. The first caller starts the
//! computation; every caller that arrives while it is running awaits the same
//! shared future. A success is kept for the lifetime of the cache. A failure
//! is logged, every waiter of that attempt receives the fallback value, and
//! the cache returns to empty so the next caller tries again.
//!
//! # State Machine
//!
//! ```text
//! Empty --[first get_or_await]--> Pending(shared future)
//! Pending --[compute Ok(v)]--> Ready(v)
//! Pending --[compute Err(e)]--> Empty
//! ```
//!
//! # Example
//!
//! ```
//! use plantwatch::cache::CacheOnSuccess;
//!
//! # tokio_test_block_on(async {
//! let cache = CacheOnSuccess::new(Vec::<String>::new, || async {
//!     Ok::<_, std::io::Error>(vec!["p2".to_string(), "p1".to_string()])
//! });
//!
//! assert_eq!(cache.get_or_await().await, vec!["p2", "p1"]);
//! assert!(cache.is_ready());
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::RwLock;
use tracing::{debug, warn};

/// Message recorded when `compute` panics.
const PANIC_MESSAGE: &str = "computation panicked";

/// Failure of a single computation attempt, reduced to its message.
///
/// Cloneable so it can travel through a shared future to every waiter.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ComputeFailed {
    message: String,
}

impl fmt::Display for ComputeFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

type ComputeFn<T> = dyn Fn() -> BoxFuture<'static, Result<T, ComputeFailed>> + Send + Sync;
type SharedCompute<T> = Shared<BoxFuture<'static, Result<T, ComputeFailed>>>;

/// Cache state. Only the cache itself moves it between variants.
enum CacheState<T> {
    Empty,
    Pending {
        generation: u64,
        future: SharedCompute<T>,
    },
    Ready(T),
}

struct Inner<T> {
    state: CacheState<T>,
    /// Bumped for every Empty -> Pending transition so a settling waiter can
    /// tell whether the pending attempt it awaited is still the current one.
    generation: u64,
}

/// What a caller has to do after inspecting the state.
enum Claim<T> {
    Ready(T),
    Await(u64, SharedCompute<T>),
}

/// Fallible, single-flight, memoizing cache for one value.
///
/// # Thread Safety
///
/// The state sits behind a `parking_lot::RwLock`. Reading a `Ready` value
/// takes only the read lock; the write lock is held for the Empty -> Pending
/// and Pending -> Ready/Empty transitions and never across an `.await`.
pub struct CacheOnSuccess<T> {
    inner: RwLock<Inner<T>>,
    compute: Arc<ComputeFn<T>>,
    fallback: Box<dyn Fn() -> T + Send + Sync>,
    compute_count: Arc<AtomicU64>,
}

impl<T> fmt::Debug for CacheOnSuccess<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        let state = match inner.state {
            CacheState::Empty => "Empty",
            CacheState::Pending { .. } => "Pending",
            CacheState::Ready(_) => "Ready",
        };
        f.debug_struct("CacheOnSuccess")
            .field("state", &state)
            .field("generation", &inner.generation)
            .field("compute_count", &self.compute_count.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<T> CacheOnSuccess<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create an empty cache.
    ///
    /// # Arguments
    ///
    /// * `fallback` - Value handed out when a computation fails. Must be free
    ///   of side effects; it may be called any number of times.
    /// * `compute` - Produces the value. Invoked at most once per
    ///   Empty -> Pending transition.
    pub fn new<F, C, Fut, E>(fallback: F, compute: C) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
        C: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: fmt::Display,
    {
        let compute: Arc<ComputeFn<T>> = Arc::new(move || {
            let fut = compute();
            async move {
                fut.await.map_err(|e| ComputeFailed {
                    message: e.to_string(),
                })
            }
            .boxed()
        });

        Self {
            inner: RwLock::new(Inner {
                state: CacheState::Empty,
                generation: 0,
            }),
            compute,
            fallback: Box::new(fallback),
            compute_count: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Return the cached value, computing it if needed.
    ///
    /// Never fails: if the computation this call awaited failed, the
    /// fallback value is returned instead and the cache is left empty.
    pub async fn get_or_await(&self) -> T {
        let (generation, future) = match self.claim() {
            Claim::Ready(value) => return value,
            Claim::Await(generation, future) => (generation, future),
        };

        match future.await {
            Ok(value) => {
                self.settle(generation, Ok(value.clone()));
                value
            }
            Err(failure) => {
                self.settle(generation, Err(failure));
                (self.fallback)()
            }
        }
    }

    /// The cached value, if a computation has already succeeded.
    pub fn peek(&self) -> Option<T> {
        match &self.inner.read().state {
            CacheState::Ready(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// Returns true once a computation has succeeded.
    pub fn is_ready(&self) -> bool {
        matches!(self.inner.read().state, CacheState::Ready(_))
    }

    /// Returns true while a computation is in flight.
    pub fn is_pending(&self) -> bool {
        matches!(self.inner.read().state, CacheState::Pending { .. })
    }

    /// Number of times `compute` has been invoked.
    pub fn compute_count(&self) -> u64 {
        self.compute_count.load(Ordering::Relaxed)
    }

    /// Inspect the state, starting a computation if the cache is empty.
    fn claim(&self) -> Claim<T> {
        {
            let inner = self.inner.read();
            match &inner.state {
                CacheState::Ready(value) => return Claim::Ready(value.clone()),
                CacheState::Pending { generation, future } => {
                    return Claim::Await(*generation, future.clone())
                }
                CacheState::Empty => {}
            }
        }

        let mut inner = self.inner.write();

        // Another caller may have won the race between the two locks.
        match &inner.state {
            CacheState::Ready(value) => return Claim::Ready(value.clone()),
            CacheState::Pending { generation, future } => {
                return Claim::Await(*generation, future.clone())
            }
            CacheState::Empty => {}
        }

        inner.generation += 1;
        let generation = inner.generation;

        let compute = Arc::clone(&self.compute);
        let count = Arc::clone(&self.compute_count);
        let future = async move {
            count.fetch_add(1, Ordering::Relaxed);
            // A panic must not poison the shared future; treat it as a failure.
            AssertUnwindSafe(async move { compute().await })
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    Err(ComputeFailed {
                        message: PANIC_MESSAGE.to_string(),
                    })
                })
        }
        .boxed()
        .shared();

        debug!(generation, "Cache empty, starting computation");
        inner.state = CacheState::Pending {
            generation,
            future: future.clone(),
        };

        Claim::Await(generation, future)
    }

    /// Record the outcome of the attempt identified by `generation`.
    ///
    /// Only the first waiter to get here moves the state; later waiters of the
    /// same attempt find it already settled and leave it alone.
    fn settle(&self, generation: u64, outcome: Result<T, ComputeFailed>) {
        let mut inner = self.inner.write();

        let is_current = matches!(
            &inner.state,
            CacheState::Pending { generation: pending, .. } if *pending == generation
        );
        if !is_current {
            return;
        }

        match outcome {
            Ok(value) => {
                debug!(generation, "Computation succeeded, value cached");
                inner.state = CacheState::Ready(value);
            }
            Err(failure) => {
                warn!(
                    generation,
                    error = %failure,
                    "Computation failed, serving fallback until next attempt"
                );
                inner.state = CacheState::Empty;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use futures::future::join_all;
    use tokio::sync::Semaphore;

    fn order(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_computation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in = Arc::clone(&calls);

        let cache = CacheOnSuccess::new(Vec::new, move || {
            let calls = Arc::clone(&calls_in);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok::<_, String>(order(&["p2", "p1"]))
            }
        });

        let results = join_all((0..16).map(|_| cache.get_or_await())).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.compute_count(), 1);
        for result in results {
            assert_eq!(result, order(&["p2", "p1"]));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_single_flight_across_spawned_tasks() {
        let gate = Arc::new(Semaphore::new(0));
        let gate_in = Arc::clone(&gate);

        let cache = Arc::new(CacheOnSuccess::new(Vec::new, move || {
            let gate = Arc::clone(&gate_in);
            async move {
                let _permit = gate.acquire().await.map_err(|e| e.to_string())?;
                Ok::<_, String>(order(&["a"]))
            }
        }));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move { cache.get_or_await().await }));
        }

        // Give every task time to reach the pending computation.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(cache.is_pending());
        gate.add_permits(1);

        for handle in handles {
            assert_eq!(handle.await.unwrap(), order(&["a"]));
        }
        assert_eq!(cache.compute_count(), 1);
        assert!(cache.is_ready());
    }

    #[tokio::test]
    async fn test_failure_returns_fallback_and_allows_retry() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_in = Arc::clone(&attempts);

        let cache = CacheOnSuccess::new(Vec::new, move || {
            let attempt = attempts_in.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    Err("network down".to_string())
                } else {
                    Ok(order(&["p1"]))
                }
            }
        });

        assert_eq!(cache.get_or_await().await, Vec::<String>::new());
        assert!(!cache.is_ready());
        assert!(!cache.is_pending());

        assert_eq!(cache.get_or_await().await, order(&["p1"]));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_panicking_compute_falls_back_and_retries() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_in = Arc::clone(&attempts);

        let cache = CacheOnSuccess::new(
            || order(&["fallback"]),
            move || {
                let attempt = attempts_in.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt == 0 {
                        panic!("sort order decoder blew up");
                    }
                    Ok::<_, String>(order(&["p3"]))
                }
            },
        );

        assert_eq!(cache.get_or_await().await, order(&["fallback"]));
        assert!(!cache.is_pending());
        assert!(!cache.is_ready());

        assert_eq!(cache.get_or_await().await, order(&["p3"]));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert!(cache.is_ready());
    }

    #[tokio::test]
    async fn test_all_waiters_of_failed_attempt_get_fallback() {
        let cache = CacheOnSuccess::new(
            || order(&["fallback"]),
            || async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Err::<Vec<String>, _>("boom")
            },
        );

        let results = join_all((0..5).map(|_| cache.get_or_await())).await;

        assert_eq!(cache.compute_count(), 1);
        assert!(results.iter().all(|r| *r == order(&["fallback"])));
        assert!(cache.peek().is_none());
    }

    #[tokio::test]
    async fn test_ready_value_is_never_recomputed() {
        let cache = CacheOnSuccess::new(Vec::new, || async { Ok::<_, String>(order(&["x", "y"])) });

        let first = cache.get_or_await().await;
        for _ in 0..10 {
            assert_eq!(cache.get_or_await().await, first);
        }

        assert_eq!(cache.compute_count(), 1);
        assert_eq!(cache.peek(), Some(first));
    }

    #[tokio::test]
    async fn test_dropped_starter_does_not_strand_computation() {
        let cache = CacheOnSuccess::new(Vec::new, || async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok::<_, String>(order(&["late"]))
        });

        // Start the computation and abandon it before it resolves.
        let abandoned = tokio::time::timeout(Duration::from_millis(1), cache.get_or_await()).await;
        assert!(abandoned.is_err());
        assert!(cache.is_pending());

        assert_eq!(cache.get_or_await().await, order(&["late"]));
        assert_eq!(cache.compute_count(), 1);
    }

    #[test]
    fn test_debug_reports_state() {
        let cache = CacheOnSuccess::new(|| 0u32, || async { Ok::<_, String>(1u32) });
        let debug = format!("{:?}", cache);
        assert!(debug.contains("Empty"));
    }
}
