use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use upi_types::ContentAddress;

use crate::error::{StoreError, StoreResult};
use crate::traits::{address_of, verify_read, ObjectStore};

/// File-per-object payload store.
///
/// Layout (git-style fan-out on the first address byte):
/// ```text
/// <root>/objects/ab/cdef0123...   (62 remaining hex characters)
/// ```
/// Objects are written to a temporary file in the fan-out directory and
/// renamed into place, so a reader never observes a partially written object.
pub struct DiskObjectStore {
    objects_dir: PathBuf,
}

impl DiskObjectStore {
    /// Open (or create) a store rooted at `root`.
    pub fn open(root: &Path) -> StoreResult<Self> {
        let objects_dir = root.join("objects");
        fs::create_dir_all(&objects_dir)?;
        info!(path = %objects_dir.display(), "object store opened");
        Ok(Self { objects_dir })
    }

    /// Directory holding the fan-out subdirectories.
    pub fn objects_dir(&self) -> &Path {
        &self.objects_dir
    }

    fn object_path(&self, address: &ContentAddress) -> PathBuf {
        let hex = address.to_hex();
        self.objects_dir.join(&hex[..2]).join(&hex[2..])
    }

    /// Every address currently on disk, sorted.
    pub fn all_addresses(&self) -> StoreResult<Vec<ContentAddress>> {
        let mut addrs = Vec::new();
        for fan_out in fs::read_dir(&self.objects_dir)? {
            let fan_out = fan_out?;
            if !fan_out.file_type()?.is_dir() {
                continue;
            }
            let prefix = fan_out.file_name().to_string_lossy().into_owned();
            for object in fs::read_dir(fan_out.path())? {
                let object = object?;
                let name = object.file_name().to_string_lossy().into_owned();
                if name.starts_with(".tmp") {
                    continue;
                }
                let address = ContentAddress::from_hex(&format!("{prefix}{name}")).map_err(|e| {
                    StoreError::Corrupt {
                        path: object.path().display().to_string(),
                        reason: e.to_string(),
                    }
                })?;
                addrs.push(address);
            }
        }
        addrs.sort();
        Ok(addrs)
    }
}

impl ObjectStore for DiskObjectStore {
    fn put(&self, data: &[u8]) -> StoreResult<ContentAddress> {
        let address = address_of(data)?;
        let path = self.object_path(&address);
        match fs::read(&path) {
            Ok(existing) => match verify_read(&address, &existing) {
                Ok(()) => return Ok(address),
                Err(e) => {
                    warn!(address = %address.short_hex(), error = %e, "rewriting corrupt object")
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let dir = path
            .parent()
            .ok_or_else(|| StoreError::Corrupt {
                path: path.display().to_string(),
                reason: "object path has no parent".into(),
            })?;
        fs::create_dir_all(dir)?;

        let mut tmp = tempfile::Builder::new().prefix(".tmp").tempfile_in(dir)?;
        tmp.write_all(data)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;

        debug!(address = %address.short_hex(), bytes = data.len(), "object written");
        Ok(address)
    }

    fn get(&self, address: &ContentAddress) -> StoreResult<Option<Vec<u8>>> {
        let data = match fs::read(self.object_path(address)) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        verify_read(address, &data)?;
        Ok(Some(data))
    }

    fn exists(&self, address: &ContentAddress) -> StoreResult<bool> {
        Ok(self.object_path(address).is_file())
    }

    fn delete(&self, address: &ContentAddress) -> StoreResult<bool> {
        match fs::remove_file(self.object_path(address)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

impl std::fmt::Debug for DiskObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskObjectStore")
            .field("objects_dir", &self.objects_dir)
            .finish()
    }
}
