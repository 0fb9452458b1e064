use std::sync::Arc;

use tracing::{debug, warn};
use upi_types::{GeoPoint, Upi};

use crate::coordinate::CoordinateHasher;
use crate::error::ResolveError;
use crate::geocode::Geocoder;
use crate::normalizer::AddressNormalizer;

/// Address → normalized address → coordinates → UPI.
///
/// Any failing step ends the resolution; no partial result is produced.
#[derive(Clone)]
pub struct AddressResolutionPipeline {
    normalizer: AddressNormalizer,
    hasher: CoordinateHasher,
    geocoder: Arc<dyn Geocoder>,
}

impl AddressResolutionPipeline {
    pub fn new(
        normalizer: AddressNormalizer,
        hasher: CoordinateHasher,
        geocoder: Arc<dyn Geocoder>,
    ) -> Self {
        Self {
            normalizer,
            hasher,
            geocoder,
        }
    }

    pub fn normalizer(&self) -> &AddressNormalizer {
        &self.normalizer
    }

    pub fn hasher(&self) -> &CoordinateHasher {
        &self.hasher
    }

    /// Normalize and geocode `address`.
    pub async fn resolve_to_point(&self, address: &str) -> Result<GeoPoint, ResolveError> {
        if address.trim().is_empty() {
            return Err(ResolveError::EmptyAddress);
        }
        let normalized = self.normalizer.normalize(address);
        debug!(%normalized, "address normalized");
        if normalized.trim().is_empty() {
            return Err(ResolveError::EmptyAddress);
        }

        match self.geocoder.resolve(&normalized).await {
            Ok(Some(point)) => {
                debug!(%normalized, coordinate = %point.coordinate(), "address geocoded");
                Ok(point)
            }
            Ok(None) => {
                warn!(%normalized, "address not resolved");
                Err(ResolveError::Unresolved(normalized))
            }
            Err(e) => {
                warn!(%normalized, error = %e, "geocoder failed");
                Err(e.into())
            }
        }
    }

    pub async fn resolve_to_upi(&self, address: &str) -> Result<Upi, ResolveError> {
        let point = self.resolve_to_point(address).await?;
        let upi = self
            .hasher
            .derive_for_point(&point)
            .map_err(|e| {
                warn!(error = %e, "derivation failed");
                e
            })?;
        debug!(upi = %upi.short_hex(), "address resolved");
        Ok(upi)
    }
}

impl std::fmt::Debug for AddressResolutionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddressResolutionPipeline")
            .field("hasher", &self.hasher)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DerivationError, GeocodeError};
    use crate::geocode::GazetteerGeocoder;
    use async_trait::async_trait;

    struct FailingGeocoder;

    #[async_trait]
    impl Geocoder for FailingGeocoder {
        async fn resolve(&self, _: &str) -> Result<Option<GeoPoint>, GeocodeError> {
            Err(GeocodeError::Unavailable("connection refused".into()))
        }
    }

    fn pipeline(geocoder: impl Geocoder + 'static) -> AddressResolutionPipeline {
        AddressResolutionPipeline::new(
            AddressNormalizer::default(),
            CoordinateHasher::default(),
            Arc::new(geocoder),
        )
    }

    fn gazetteer() -> GazetteerGeocoder {
        GazetteerGeocoder::default()
            .with_entry(
                "123 Main Street",
                GeoPoint::new(40.712776, -74.005974).with_unit("4b"),
            )
            .with_entry("5 Coarse Road", GeoPoint::new(40.71, -74.0))
    }

    #[tokio::test]
    async fn resolves_known_address() {
        let p = pipeline(gazetteer());
        let upi = p.resolve_to_upi("123 Main St.").await.unwrap();
        let direct = CoordinateHasher::default()
            .derive_upi(Some(40.712776), Some(-74.005974), Some("4B"))
            .unwrap();
        assert_eq!(upi, direct);
    }

    #[tokio::test]
    async fn empty_address_short_circuits() {
        let p = pipeline(FailingGeocoder);
        assert!(matches!(
            p.resolve_to_upi("").await,
            Err(ResolveError::EmptyAddress)
        ));
        assert!(matches!(
            p.resolve_to_upi("  ...  ").await,
            Err(ResolveError::EmptyAddress)
        ));
    }

    #[tokio::test]
    async fn unknown_address_is_unresolved() {
        let p = pipeline(gazetteer());
        assert!(matches!(
            p.resolve_to_upi("1 Nowhere Lane").await,
            Err(ResolveError::Unresolved(addr)) if addr == "1 nowhere ln"
        ));
    }

    #[tokio::test]
    async fn geocoder_failure_propagates() {
        let p = pipeline(FailingGeocoder);
        assert!(matches!(
            p.resolve_to_upi("123 Main Street").await,
            Err(ResolveError::Geocode(GeocodeError::Unavailable(_)))
        ));
    }

    #[tokio::test]
    async fn imprecise_coordinates_fail_derivation() {
        let p = pipeline(gazetteer());
        assert!(matches!(
            p.resolve_to_upi("5 Coarse Road").await,
            Err(ResolveError::Derivation(
                DerivationError::InsufficientPrecision { .. }
            ))
        ));
    }
}
