//! In-memory caching of derived values.
//!
//! The custom plant sort order is fetched from the remote catalogue once and
//! then reused by every list emission. [`CacheOnSuccess`] provides that with
//! single-flight semantics: concurrent readers share one fetch, failures fall
//! back to a default and stay retryable, successes are kept.
//!
//! # Architecture
//!
//! ```text
//! get_or_await() ──► Ready(v)?    ──► v
//!                ──► Pending(f)?  ──► await f ──► v | fallback()
//!                ──► Empty        ──► start compute, install Pending(f)
//! ```

mod memo;

pub use memo::CacheOnSuccess;
