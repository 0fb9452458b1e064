//! Property identifier derivation.
//!
//! Converts free-form addresses and coordinates into Unique Property
//! Identifiers ([`Upi`](upi_types::Upi)):
//! - [`AddressNormalizer`]: lower-cases, abbreviates and strips an address
//! - [`CoordinateHasher`]: Keccak-256 over a canonical coordinate string
//! - [`Geocoder`]: the address-to-coordinate collaborator contract, with the
//!   table-backed [`GazetteerGeocoder`]
//! - [`AddressResolutionPipeline`]: normalize, geocode, derive
//! - [`Identifier`]: the sentinel-returning service boundary

pub mod coordinate;
pub mod error;
pub mod geocode;
pub mod identifier;
pub mod normalizer;
pub mod pipeline;

pub use coordinate::{CoordinateHasher, DEFAULT_MIN_FRACTION_DIGITS};
pub use error::{DerivationError, GeocodeError, ResolveError};
pub use geocode::{GazetteerEntry, GazetteerGeocoder, Geocoder};
pub use identifier::{Identifier, IdentifierConfig};
pub use normalizer::{AddressNormalizer, STANDARD_ABBREVIATIONS};
pub use pipeline::AddressResolutionPipeline;
