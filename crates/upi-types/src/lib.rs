//! Foundation types for the UPI registry.
//!
//! This crate provides the identifier and location types shared by every
//! other crate in the workspace.
//!
//! # Key Types
//!
//! - [`Upi`]: Unique Property Identifier (Keccak-256 of a canonical coordinate string)
//! - [`ContentAddress`]: Content-addressed identifier for stored payloads (BLAKE3)
//! - [`Coordinate`]: A latitude/longitude pair in degrees
//! - [`UnitId`]: Normalized unit qualifier within a property (apartment, suite)
//! - [`GeoPoint`]: Geocoder output: coordinate plus optional unit

pub mod content;
pub mod coordinate;
pub mod error;
pub mod upi;

pub use content::ContentAddress;
pub use coordinate::{Coordinate, GeoPoint, UnitId};
pub use error::TypeError;
pub use upi::Upi;
