use upi_crypto::ContentHasher;
use upi_types::ContentAddress;

use crate::error::{StoreError, StoreResult};

/// Content-addressed payload store.
///
/// All implementations must satisfy these invariants:
/// - `put` is referentially transparent: the same bytes always produce the
///   same address, whatever the write order or time.
/// - Objects are immutable once written; re-putting is a no-op.
/// - `get` verifies the bytes it returns against the requested address.
/// - All I/O errors are propagated, never silently ignored.
pub trait ObjectStore: Send + Sync {
    /// Store a payload and return its content address.
    ///
    /// Returns [`StoreError::EmptyPayload`] for zero-length input.
    fn put(&self, data: &[u8]) -> StoreResult<ContentAddress>;

    /// Read a payload by address.
    ///
    /// Returns `Ok(None)` if the object does not exist.
    /// Returns `Err` on I/O failure or hash mismatch.
    fn get(&self, address: &ContentAddress) -> StoreResult<Option<Vec<u8>>>;

    /// Check whether an object exists in the store.
    fn exists(&self, address: &ContentAddress) -> StoreResult<bool>;

    /// Delete an object. Returns `true` if the object existed.
    ///
    /// Intended for garbage collection only; log entries referencing a
    /// deleted object will no longer resolve.
    fn delete(&self, address: &ContentAddress) -> StoreResult<bool>;

    /// Store multiple payloads and return their addresses in input order.
    fn put_batch(&self, payloads: &[&[u8]]) -> StoreResult<Vec<ContentAddress>> {
        payloads.iter().map(|data| self.put(data)).collect()
    }

    /// Read multiple payloads in input order.
    fn get_batch(&self, addresses: &[ContentAddress]) -> StoreResult<Vec<Option<Vec<u8>>>> {
        addresses.iter().map(|addr| self.get(addr)).collect()
    }
}

/// Compute the address of a payload, rejecting empty input.
pub fn address_of(data: &[u8]) -> StoreResult<ContentAddress> {
    if data.is_empty() {
        return Err(StoreError::EmptyPayload);
    }
    Ok(ContentHasher::BLOB.address(data))
}

/// Check that `data` hashes to `address`.
pub fn verify_read(address: &ContentAddress, data: &[u8]) -> StoreResult<()> {
    if ContentHasher::BLOB.verify(data, address) {
        Ok(())
    } else {
        Err(StoreError::HashMismatch {
            address: *address,
            computed: ContentHasher::BLOB.address(data),
        })
    }
}
