use std::collections::HashMap;
use std::sync::RwLock;

use tracing::debug;
use upi_types::ContentAddress;

use crate::error::StoreResult;
use crate::traits::{address_of, verify_read, ObjectStore};

/// In-memory, HashMap-based payload store.
///
/// Intended for tests and embedding. All payloads are held in memory behind a
/// `RwLock` for safe concurrent access. Payloads are cloned on read/write.
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<ContentAddress, Vec<u8>>>,
}

impl InMemoryObjectStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    /// Total bytes across all stored objects.
    pub fn total_bytes(&self) -> u64 {
        self.objects
            .read()
            .expect("lock poisoned")
            .values()
            .map(|data| data.len() as u64)
            .sum()
    }

    /// Return a sorted list of all addresses in the store.
    pub fn all_addresses(&self) -> Vec<ContentAddress> {
        let map = self.objects.read().expect("lock poisoned");
        let mut addrs: Vec<ContentAddress> = map.keys().copied().collect();
        addrs.sort();
        addrs
    }

    #[cfg(test)]
    fn overwrite_raw(&self, address: ContentAddress, data: Vec<u8>) {
        self.objects
            .write()
            .expect("lock poisoned")
            .insert(address, data);
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn put(&self, data: &[u8]) -> StoreResult<ContentAddress> {
        let address = address_of(data)?;
        let mut map = self.objects.write().expect("lock poisoned");
        // Same address always maps to the same bytes, so an existing entry
        // is left alone.
        map.entry(address).or_insert_with(|| data.to_vec());
        debug!(address = %address.short_hex(), bytes = data.len(), "object stored");
        Ok(address)
    }

    fn get(&self, address: &ContentAddress) -> StoreResult<Option<Vec<u8>>> {
        let map = self.objects.read().expect("lock poisoned");
        match map.get(address) {
            Some(data) => {
                verify_read(address, data)?;
                Ok(Some(data.clone()))
            }
            None => Ok(None),
        }
    }

    fn exists(&self, address: &ContentAddress) -> StoreResult<bool> {
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.contains_key(address))
    }

    fn delete(&self, address: &ContentAddress) -> StoreResult<bool> {
        let mut map = self.objects.write().expect("lock poisoned");
        Ok(map.remove(address).is_some())
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len();
        f.debug_struct("InMemoryObjectStore")
            .field("object_count", &count)
            .finish()
    }
}
