use upi_crypto::UpiHasher;
use upi_types::{Coordinate, GeoPoint, UnitId, Upi};

use crate::error::DerivationError;

/// Fractional digits each coordinate must carry unless configured otherwise.
pub const DEFAULT_MIN_FRACTION_DIGITS: usize = 6;

const SEPARATOR: &str = "||";

/// Derives UPIs from coordinate pairs.
///
/// The canonical source string is
/// `signedLat || signedLng || UNIT`, where each coordinate is rendered as its
/// shortest round-trip decimal with an explicit `+` for non-negative values,
/// and the unit is trimmed and upper-cased. The UPI is the Keccak-256 digest
/// of that string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoordinateHasher {
    min_fraction_digits: usize,
}

impl CoordinateHasher {
    pub fn new(min_fraction_digits: usize) -> Result<Self, DerivationError> {
        if min_fraction_digits == 0 {
            return Err(DerivationError::InvalidPrecisionConfig);
        }
        Ok(Self {
            min_fraction_digits,
        })
    }

    pub fn min_fraction_digits(&self) -> usize {
        self.min_fraction_digits
    }

    pub fn derive_upi(
        &self,
        lat: Option<f64>,
        lng: Option<f64>,
        unit: Option<&str>,
    ) -> Result<Upi, DerivationError> {
        let source = self.canonical_source(lat, lng, unit)?;
        Ok(UpiHasher::hash_canonical(&source))
    }

    /// Derive the UPI of a geocoded point.
    pub fn derive_for_point(&self, point: &GeoPoint) -> Result<Upi, DerivationError> {
        let Coordinate { lat, lng } = point.coordinate();
        let unit = point.unit();
        self.derive_upi(Some(lat), Some(lng), Some(unit.as_str()))
    }

    /// The string that is hashed for these inputs.
    pub fn canonical_source(
        &self,
        lat: Option<f64>,
        lng: Option<f64>,
        unit: Option<&str>,
    ) -> Result<String, DerivationError> {
        let lat = self.render("lat", lat)?;
        let lng = self.render("lng", lng)?;
        let unit = UnitId::from_option(unit);
        Ok([lat.as_str(), lng.as_str(), unit.as_str()].join(SEPARATOR))
    }

    fn render(&self, axis: &'static str, value: Option<f64>) -> Result<String, DerivationError> {
        let value = value.ok_or(DerivationError::MissingCoordinate { axis })?;
        if !value.is_finite() {
            return Err(DerivationError::NotFinite { axis, value });
        }
        let rendered = if value < 0.0 {
            value.to_string()
        } else {
            format!("+{}", value.abs())
        };
        let fraction_digits = rendered
            .split_once('.')
            .map(|(_, fraction)| fraction.len())
            .unwrap_or(0);
        if fraction_digits < self.min_fraction_digits {
            return Err(DerivationError::InsufficientPrecision {
                axis,
                rendered,
                required: self.min_fraction_digits,
            });
        }
        Ok(rendered)
    }
}

impl Default for CoordinateHasher {
    fn default() -> Self {
        Self {
            min_fraction_digits: DEFAULT_MIN_FRACTION_DIGITS,
        }
    }
}
