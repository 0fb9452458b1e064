use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};
use upi_types::GeoPoint;

use crate::error::GeocodeError;
use crate::normalizer::AddressNormalizer;

/// Address-to-coordinate resolution.
///
/// `Ok(None)` means the address is unknown. `Err` is reserved for failures
/// of the geocoder itself.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn resolve(&self, normalized_address: &str) -> Result<Option<GeoPoint>, GeocodeError>;
}

/// One row of a gazetteer file.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct GazetteerEntry {
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub unit_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GazetteerFile {
    #[serde(default)]
    entry: Vec<GazetteerEntry>,
}

/// Geocoder backed by a fixed table of known addresses.
///
/// Keys are normalized on insert, so lookups with any spelling that
/// normalizes to the same string hit the same entry.
///
/// File format:
/// ```toml
/// [[entry]]
/// address = "123 Main Street"
/// lat = 40.712776
/// lng = -74.005974
/// unit_id = "4B"
/// ```
#[derive(Clone, Debug, Default)]
pub struct GazetteerGeocoder {
    normalizer: AddressNormalizer,
    points: HashMap<String, GeoPoint>,
}

impl GazetteerGeocoder {
    pub fn new(normalizer: AddressNormalizer) -> Self {
        Self {
            normalizer,
            points: HashMap::new(),
        }
    }

    pub fn insert(&mut self, address: &str, point: GeoPoint) {
        let key = self.normalizer.normalize(address);
        self.points.insert(key, point);
    }

    pub fn with_entry(mut self, address: &str, point: GeoPoint) -> Self {
        self.insert(address, point);
        self
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn from_toml_str(text: &str) -> Result<Self, GeocodeError> {
        let file: GazetteerFile = toml::from_str(text)?;
        let mut gazetteer = Self::default();
        for entry in file.entry {
            if entry.address.trim().is_empty() {
                return Err(GeocodeError::InvalidEntry {
                    address: entry.address,
                    reason: "address is empty".into(),
                });
            }
            let mut point = GeoPoint::new(entry.lat, entry.lng);
            point.unit_id = entry.unit_id;
            if !point.coordinate().is_finite() {
                return Err(GeocodeError::InvalidEntry {
                    address: entry.address,
                    reason: format!("coordinates {} must be finite", point.coordinate()),
                });
            }
            gazetteer.insert(&entry.address, point);
        }
        Ok(gazetteer)
    }

    pub fn load(path: &Path) -> Result<Self, GeocodeError> {
        let text = std::fs::read_to_string(path)?;
        let gazetteer = Self::from_toml_str(&text)?;
        info!(path = %path.display(), entries = gazetteer.len(), "gazetteer loaded");
        Ok(gazetteer)
    }
}

#[async_trait]
impl Geocoder for GazetteerGeocoder {
    async fn resolve(&self, normalized_address: &str) -> Result<Option<GeoPoint>, GeocodeError> {
        let key = self.normalizer.normalize(normalized_address);
        let point = self.points.get(&key).cloned();
        debug!(address = %key, found = point.is_some(), "gazetteer lookup");
        Ok(point)
    }
}
