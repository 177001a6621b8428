use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// A named place whose coordinates scope one upstream search query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetLocation {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

impl TargetLocation {
    #[must_use]
    pub fn new(name: &str, lat: f64, lng: f64) -> Self {
        Self {
            name: name.to_string(),
            lat,
            lng,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LocationsFile {
    pub locations: Vec<TargetLocation>,
}

/// One city per province and territory, in sweep order.
#[must_use]
pub fn default_locations() -> Vec<TargetLocation> {
    vec![
        TargetLocation::new("Toronto", 43.653_2, -79.383_2),
        TargetLocation::new("Ottawa", 45.421_5, -75.697_2),
        TargetLocation::new("Montreal", 45.501_7, -73.567_3),
        TargetLocation::new("Quebec City", 46.813_9, -71.208_0),
        TargetLocation::new("Vancouver", 49.282_7, -123.120_7),
        TargetLocation::new("Victoria", 48.428_4, -123.365_6),
        TargetLocation::new("Calgary", 51.044_7, -114.071_9),
        TargetLocation::new("Edmonton", 53.546_1, -113.493_8),
        TargetLocation::new("Winnipeg", 49.895_1, -97.138_4),
        TargetLocation::new("Saskatoon", 52.133_2, -106.670_0),
        TargetLocation::new("Halifax", 44.648_8, -63.575_2),
        TargetLocation::new("Fredericton", 45.963_6, -66.643_1),
        TargetLocation::new("St. John's", 47.561_5, -52.712_6),
        TargetLocation::new("Charlottetown", 46.238_2, -63.131_1),
        TargetLocation::new("Yellowknife", 62.454_0, -114.371_8),
        TargetLocation::new("Whitehorse", 60.721_2, -135.056_8),
        TargetLocation::new("Iqaluit", 63.746_7, -68.516_7),
    ]
}

/// Load and validate the target location list from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_locations(path: &Path) -> Result<Vec<TargetLocation>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LocationsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let file: LocationsFile = serde_yaml::from_str(&content)?;
    validate_locations(&file.locations)?;
    Ok(file.locations)
}

fn validate_locations(locations: &[TargetLocation]) -> Result<(), ConfigError> {
    if locations.is_empty() {
        return Err(ConfigError::Validation(
            "locations file must list at least one location".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for location in locations {
        if location.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "location name must be non-empty".to_string(),
            ));
        }

        if !(-90.0..=90.0).contains(&location.lat) || !(-180.0..=180.0).contains(&location.lng) {
            return Err(ConfigError::Validation(format!(
                "location '{}' has out-of-range coordinates ({}, {})",
                location.name, location.lat, location.lng
            )));
        }

        if !seen.insert(location.name.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate location name: '{}'",
                location.name
            )));
        }
    }

    Ok(())
}
