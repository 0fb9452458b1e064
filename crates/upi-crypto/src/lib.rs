//! Hashing primitives for the UPI registry.
//!
//! Provides domain-separated BLAKE3 hashing for content addresses and log
//! record chains, and the Keccak-256 digest that turns a canonical coordinate
//! string into a [`Upi`](upi_types::Upi).
//!
//! All crypto operations wrap established libraries.

pub mod hasher;
pub mod keccak;

pub use hasher::{ContentHasher, HasherError};
pub use keccak::UpiHasher;
