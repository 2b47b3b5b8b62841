//! HTTP implementation of the plant catalogue using reqwest.

use std::time::Duration;

use bytes::Bytes;
use futures::future::{BoxFuture, FutureExt};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use super::{PlantService, ServiceError};
use crate::model::Plant;

/// Catalogue location used when no base URL is configured.
pub const DEFAULT_BASE_URL: &str = "https://raw.githubusercontent.com/googlecodelabs/kotlin-coroutines/master/advanced-coroutines-codelab/sunflower/src/main/assets/";

/// Request timeout used when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const PLANTS_PATH: &str = "plants.json";
const SORT_ORDER_PATH: &str = "custom_plant_sort_order.json";

/// Settings for [`HttpPlantService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpServiceConfig {
    /// Directory URL the catalogue files live under.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for HttpServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl HttpServiceConfig {
    /// Create a config for `base_url` with the default timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Row shape of the sort order file; only the id is used.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SortOrderRow {
    plant_id: String,
}

/// Plant catalogue served as static JSON files.
///
/// Zone queries download the full catalogue and filter locally, since the
/// server offers no per-zone endpoint.
pub struct HttpPlantService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPlantService {
    /// Create a client from `config`.
    pub fn new(config: &HttpServiceConfig) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ServiceError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    /// Full URL for a catalogue file.
    pub fn url_for(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ServiceError> {
        let body = self.get_body(path).await?;
        decode(&body)
    }

    async fn get_body(&self, path: &str) -> Result<Bytes, ServiceError> {
        let url = self.url_for(path);
        debug!(url = %url, "Fetching catalogue file");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ServiceError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Status {
                status: status.as_u16(),
                url,
            });
        }

        response
            .bytes()
            .await
            .map_err(|e| ServiceError::Http(e.to_string()))
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, ServiceError> {
    serde_json::from_slice(body).map_err(|e| ServiceError::Decode(e.to_string()))
}

fn decode_sort_order(body: &[u8]) -> Result<Vec<String>, ServiceError> {
    let rows: Vec<SortOrderRow> = decode(body)?;
    Ok(rows.into_iter().map(|row| row.plant_id).collect())
}

impl PlantService for HttpPlantService {
    fn all_plants(&self) -> BoxFuture<'_, Result<Vec<Plant>, ServiceError>> {
        self.get_json::<Vec<Plant>>(PLANTS_PATH).boxed()
    }

    fn plants_by_grow_zone(
        &self,
        grow_zone_number: i32,
    ) -> BoxFuture<'_, Result<Vec<Plant>, ServiceError>> {
        async move {
            let plants: Vec<Plant> = self.get_json(PLANTS_PATH).await?;
            Ok(plants
                .into_iter()
                .filter(|p| p.grow_zone_number == grow_zone_number)
                .collect())
        }
        .boxed()
    }

    fn custom_plant_sort_order(&self) -> BoxFuture<'_, Result<Vec<String>, ServiceError>> {
        async move {
            let body = self.get_body(SORT_ORDER_PATH).await?;
            decode_sort_order(&body)
        }
        .boxed()
    }
}
