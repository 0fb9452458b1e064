use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use upi_types::{GeoPoint, Upi};

use crate::coordinate::{CoordinateHasher, DEFAULT_MIN_FRACTION_DIGITS};
use crate::error::{DerivationError, ResolveError};
use crate::geocode::Geocoder;
use crate::normalizer::AddressNormalizer;
use crate::pipeline::AddressResolutionPipeline;

/// Identifier service settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentifierConfig {
    /// Fractional digits each coordinate must carry.
    pub min_fraction_digits: usize,
}

impl Default for IdentifierConfig {
    fn default() -> Self {
        Self {
            min_fraction_digits: DEFAULT_MIN_FRACTION_DIGITS,
        }
    }
}

/// The identifier service boundary.
///
/// The `parse_*` methods return `None` for any input they cannot turn into a
/// result; typed counterparts (`derive_upi`, `resolve_to_upi`) report why.
pub struct Identifier {
    pipeline: AddressResolutionPipeline,
    initialized: AtomicBool,
}

impl Identifier {
    pub fn new(
        config: IdentifierConfig,
        geocoder: Arc<dyn Geocoder>,
    ) -> Result<Self, DerivationError> {
        let hasher = CoordinateHasher::new(config.min_fraction_digits)?;
        Ok(Self::from_pipeline(AddressResolutionPipeline::new(
            AddressNormalizer::default(),
            hasher,
            geocoder,
        )))
    }

    pub fn from_pipeline(pipeline: AddressResolutionPipeline) -> Self {
        Self {
            pipeline,
            initialized: AtomicBool::new(false),
        }
    }

    /// Mark the service ready. Idempotent; always succeeds.
    pub async fn initialize(&self) -> bool {
        if !self.initialized.swap(true, Ordering::AcqRel) {
            info!("identifier service initialized");
        }
        true
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn pipeline(&self) -> &AddressResolutionPipeline {
        &self.pipeline
    }

    pub fn normalize_address(&self, address: &str) -> String {
        self.pipeline.normalizer().normalize(address)
    }

    pub fn derive_upi(
        &self,
        lat: Option<f64>,
        lng: Option<f64>,
        unit: Option<&str>,
    ) -> Result<Upi, DerivationError> {
        self.pipeline.hasher().derive_upi(lat, lng, unit)
    }

    pub async fn resolve_to_upi(&self, address: &str) -> Result<Upi, ResolveError> {
        self.pipeline.resolve_to_upi(address).await
    }

    /// Derive a UPI from JSON-shaped inputs.
    ///
    /// Coordinates must be JSON numbers. The unit may be a string, a number
    /// or `null`.
    pub fn parse_coordinates_to_upi(&self, lat: &Value, lng: &Value, unit: &Value) -> Option<Upi> {
        let unit = match unit {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => {
                debug!("unit id is not a string");
                return None;
            }
        };
        match self.derive_upi(lat.as_f64(), lng.as_f64(), unit.as_deref()) {
            Ok(upi) => Some(upi),
            Err(e) => {
                debug!(error = %e, "coordinates rejected");
                None
            }
        }
    }

    pub async fn parse_address_to_coordinates(&self, address: &str) -> Option<GeoPoint> {
        self.pipeline.resolve_to_point(address).await.ok()
    }

    pub async fn parse_address_to_upi(&self, address: &str) -> Option<Upi> {
        self.resolve_to_upi(address).await.ok()
    }
}

impl std::fmt::Debug for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identifier")
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocode::GazetteerGeocoder;
    use serde_json::json;

    fn identifier() -> Identifier {
        let gazetteer = GazetteerGeocoder::default().with_entry(
            "123 Main Street",
            GeoPoint::new(40.712776, -74.005974),
        );
        Identifier::new(IdentifierConfig::default(), Arc::new(gazetteer)).unwrap()
    }

    #[tokio::test]
    async fn initialize_is_idempotent() {
        let id = identifier();
        assert!(!id.is_initialized());
        assert!(id.initialize().await);
        assert!(id.initialize().await);
        assert!(id.is_initialized());
    }

    #[test]
    fn zero_precision_config_is_rejected() {
        let config = IdentifierConfig {
            min_fraction_digits: 0,
        };
        let err = Identifier::new(config, Arc::new(GazetteerGeocoder::default())).unwrap_err();
        assert_eq!(err, DerivationError::InvalidPrecisionConfig);
    }

    #[test]
    fn parse_coordinates_accepts_numbers() {
        let id = identifier();
        let upi = id
            .parse_coordinates_to_upi(&json!(40.712776), &json!(-74.005974), &Value::Null)
            .unwrap();
        assert_eq!(
            upi.to_hex(),
            "0x5027cd64523c044065fbe1997f0ed97ff190b55aa488c49de1f905398f353e86"
        );
    }

    #[test]
    fn parse_coordinates_rejects_non_numbers() {
        let id = identifier();
        assert!(id
            .parse_coordinates_to_upi(&json!("40.712776"), &json!(-74.005974), &Value::Null)
            .is_none());
        assert!(id
            .parse_coordinates_to_upi(&Value::Null, &json!(-74.005974), &Value::Null)
            .is_none());
        assert!(id
            .parse_coordinates_to_upi(&json!(40.712776), &json!(-74.005974), &json!(["a"]))
            .is_none());
    }

    #[test]
    fn parse_coordinates_rejects_low_precision() {
        let id = identifier();
        assert!(id
            .parse_coordinates_to_upi(&json!(40.71), &json!(-74.0), &Value::Null)
            .is_none());
    }

    #[test]
    fn numeric_unit_is_accepted() {
        let id = identifier();
        let a = id.parse_coordinates_to_upi(&json!(40.712776), &json!(-74.005974), &json!(12));
        let b = id.parse_coordinates_to_upi(&json!(40.712776), &json!(-74.005974), &json!("12"));
        assert_eq!(a, b);
        assert!(a.is_some());
    }

    #[tokio::test]
    async fn address_round_trip() {
        let id = identifier();
        let point = id.parse_address_to_coordinates("123 main street").await.unwrap();
        assert_eq!(point.lng, -74.005974);
        let upi = id.parse_address_to_upi("123 Main St").await.unwrap();
        assert_eq!(
            Some(upi),
            id.parse_coordinates_to_upi(&json!(40.712776), &json!(-74.005974), &Value::Null)
        );
    }

    #[tokio::test]
    async fn unknown_or_empty_address_is_none() {
        let id = identifier();
        assert!(id.parse_address_to_upi("").await.is_none());
        assert!(id.parse_address_to_coordinates("").await.is_none());
        assert!(id.parse_address_to_upi("77 Unknown Blvd").await.is_none());
    }

    #[test]
    fn normalize_address_uses_standard_table() {
        assert_eq!(identifier().normalize_address("1 Oak Avenue"), "1 oak ave");
    }
}
