//! PlantWatch - a reactive, filterable plant catalogue
//!
//! This library keeps a local plant store in sync with a remote catalogue and
//! exposes a sorted, filterable view of it together with refresh status.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐   set_filter_key    ┌───────────────────┐
//! │ PlantListController  │────────────────────►│   SwitchingFeed   │
//! └─────────┬────────────┘                     │ (upstream switch, │
//!           │ refresh(key)                     │  apply_sort)      │
//!           ▼                                  └───┬───────────▲───┘
//! ┌──────────────────────┐                         │ query     │ sort order
//! │   LoadCoordinator    │                         ▼           │
//! │ Idle/Loading/Error   │   ┌─────────────┐  ┌──────────┐ ┌───┴───────────┐
//! └─────────┬────────────┘   │ PlantService│  │PlantStore│ │CacheOnSuccess │
//!           └──► PlantRepository ──fetch──►   │          │ └───────────────┘
//!                              └──insert_all─►└──────────┘
//! ```
//!
//! # Modules
//!
//! - [`cache`] - single-flight memoizing cache that only keeps successes
//! - [`feed`] - sorted plant stream that follows the active filter key
//! - [`load`] - tracked refresh tasks and the spinner/error state
//! - [`controller`] - the surface a front end holds
//! - [`repository`] - store, catalogue and sort order wiring
//! - [`store`], [`service`] - the local store and remote catalogue seams
//! - [`config`], [`logging`] - INI configuration and tracing setup

pub mod cache;
pub mod config;
pub mod controller;
pub mod feed;
pub mod load;
pub mod logging;
pub mod model;
pub mod observable;
pub mod repository;
pub mod service;
pub mod store;

pub use controller::PlantListController;
pub use load::{LoadState, TrackedOutcome};
pub use model::{FilterKey, Plant};
pub use repository::{PlantRepository, RefreshError};

/// Library version, from the package manifest.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
