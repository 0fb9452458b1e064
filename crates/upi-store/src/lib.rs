//! Content-addressed payload storage for the UPI registry.
//!
//! Every payload is stored as an immutable blob identified by the BLAKE3 hash
//! of its bytes. Writing the same bytes twice yields the same
//! [`ContentAddress`](upi_types::ContentAddress) and stores one copy.
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`InMemoryObjectStore`] -- `HashMap`-based store for tests and embedding
//! - [`DiskObjectStore`] -- one file per object under a fan-out directory
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written (content-addressing guarantees this).
//! 2. Reads re-hash the bytes and fail on mismatch.
//! 3. Concurrent reads are always safe (objects are immutable).
//! 4. The store never interprets payload contents.
//! 5. All I/O errors are propagated, never silently ignored.

pub mod disk;
pub mod error;
pub mod memory;
pub mod traits;

pub use disk::DiskObjectStore;
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryObjectStore;
pub use traits::ObjectStore;
