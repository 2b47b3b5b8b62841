//! Plant records and the filter key that selects which of them are shown.
//!
//! Field names follow the remote catalogue's camelCase JSON so the same type
//! is used for network decoding and for store rows.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Default watering interval in days when the catalogue omits one.
pub const DEFAULT_WATERING_INTERVAL: i32 = 7;

/// A single plant in the catalogue.
///
/// Only `plant_id` and `name` take part in ordering; the remaining fields are
/// carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plant {
    /// Stable identifier, also used by the custom sort order.
    pub plant_id: String,
    /// Display name; the secondary sort key.
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub grow_zone_number: i32,
    /// How often the plant should be watered, in days.
    #[serde(default = "default_watering_interval")]
    pub watering_interval: i32,
    #[serde(default)]
    pub image_url: String,
}

fn default_watering_interval() -> i32 {
    DEFAULT_WATERING_INTERVAL
}

impl Plant {
    /// Create a plant with the given id, name and grow zone.
    pub fn new(plant_id: impl Into<String>, name: impl Into<String>, grow_zone_number: i32) -> Self {
        Self {
            plant_id: plant_id.into(),
            name: name.into(),
            description: String::new(),
            grow_zone_number,
            watering_interval: DEFAULT_WATERING_INTERVAL,
            image_url: String::new(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the watering interval in days.
    pub fn with_watering_interval(mut self, days: i32) -> Self {
        self.watering_interval = days;
        self
    }

    /// Set the image URL.
    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = url.into();
        self
    }
}

impl fmt::Display for Plant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.plant_id)
    }
}

/// Selects which upstream query feeds the plant list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterKey {
    /// Every plant in the store.
    #[default]
    Unfiltered,
    /// Only plants in the given grow zone.
    Zone(i32),
}

impl FilterKey {
    /// Returns true if this key narrows the list.
    pub fn is_filtered(&self) -> bool {
        !matches!(self, FilterKey::Unfiltered)
    }

    /// Grow zone number, if filtered.
    pub fn zone(&self) -> Option<i32> {
        match self {
            FilterKey::Unfiltered => None,
            FilterKey::Zone(zone) => Some(*zone),
        }
    }
}

impl From<Option<i32>> for FilterKey {
    fn from(zone: Option<i32>) -> Self {
        zone.map(FilterKey::Zone).unwrap_or(FilterKey::Unfiltered)
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterKey::Unfiltered => write!(f, "all"),
            FilterKey::Zone(zone) => write!(f, "zone {}", zone),
        }
    }
}

/// Error returned when a filter key string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid filter key '{0}' (expected 'all' or 'zone N')")]
pub struct ParseFilterKeyError(String);

impl FromStr for FilterKey {
    type Err = ParseFilterKeyError;

    /// Accepts `all`, `zone N`, `zone:N` or a bare zone number.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().to_lowercase();
        if trimmed == "all" || trimmed.is_empty() {
            return Ok(FilterKey::Unfiltered);
        }

        let number = trimmed
            .strip_prefix("zone")
            .map(|rest| rest.trim_start_matches([':', ' ']))
            .unwrap_or(&trimmed);

        number
            .parse::<i32>()
            .map(FilterKey::Zone)
            .map_err(|_| ParseFilterKeyError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plant_decodes_catalogue_json() {
        let json = r#"{
            "plantId": "malus-pumila",
            "name": "Apple",
            "description": "An apple.",
            "growZoneNumber": 3,
            "wateringInterval": 30,
            "imageUrl": "https://example.com/apple.jpg"
        }"#;

        let plant: Plant = serde_json::from_str(json).unwrap();
        assert_eq!(plant.plant_id, "malus-pumila");
        assert_eq!(plant.name, "Apple");
        assert_eq!(plant.grow_zone_number, 3);
        assert_eq!(plant.watering_interval, 30);
    }

    #[test]
    fn test_plant_defaults_optional_fields() {
        let json = r#"{"plantId": "x", "name": "X", "growZoneNumber": 1}"#;
        let plant: Plant = serde_json::from_str(json).unwrap();
        assert_eq!(plant.watering_interval, DEFAULT_WATERING_INTERVAL);
        assert!(plant.description.is_empty());
        assert!(plant.image_url.is_empty());
    }

    #[test]
    fn test_filter_key_display_and_parse() {
        assert_eq!(FilterKey::Unfiltered.to_string(), "all");
        assert_eq!(FilterKey::Zone(9).to_string(), "zone 9");

        assert_eq!("all".parse::<FilterKey>().unwrap(), FilterKey::Unfiltered);
        assert_eq!("zone 9".parse::<FilterKey>().unwrap(), FilterKey::Zone(9));
        assert_eq!("Zone:4".parse::<FilterKey>().unwrap(), FilterKey::Zone(4));
        assert_eq!("12".parse::<FilterKey>().unwrap(), FilterKey::Zone(12));
        assert!("tropical".parse::<FilterKey>().is_err());
    }

    #[test]
    fn test_filter_key_from_option() {
        assert_eq!(FilterKey::from(None), FilterKey::Unfiltered);
        assert_eq!(FilterKey::from(Some(5)), FilterKey::Zone(5));
        assert!(FilterKey::Zone(5).is_filtered());
        assert_eq!(FilterKey::Unfiltered.zone(), None);
    }
}
