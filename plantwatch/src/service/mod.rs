//! Remote plant catalogue.
//!
//! [`PlantService`] is the seam between the coordination logic and the
//! network. The repository only ever talks to the trait, so tests plug in a
//! scripted implementation and the CLI plugs in [`HttpPlantService`].

mod http;

pub use http::{HttpPlantService, HttpServiceConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};

use futures::future::BoxFuture;
use thiserror::Error;

use crate::model::Plant;

/// Errors returned by the remote catalogue.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    /// Transport failure (connect, timeout, TLS).
    #[error("Request failed: {0}")]
    Http(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// The body could not be decoded.
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// The client could not be constructed.
    #[error("Failed to create HTTP client: {0}")]
    Client(String),
}

/// Read access to the remote plant catalogue.
///
/// All methods are fallible; callers decide how a failure degrades.
pub trait PlantService: Send + Sync {
    /// Every plant in the catalogue.
    fn all_plants(&self) -> BoxFuture<'_, Result<Vec<Plant>, ServiceError>>;

    /// Plants in one grow zone.
    fn plants_by_grow_zone(&self, grow_zone_number: i32)
        -> BoxFuture<'_, Result<Vec<Plant>, ServiceError>>;

    /// Preferred display order as a list of plant ids.
    fn custom_plant_sort_order(&self) -> BoxFuture<'_, Result<Vec<String>, ServiceError>>;
}
