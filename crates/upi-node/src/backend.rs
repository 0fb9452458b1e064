use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};
use upi_ledger::{InMemoryRecordLog, JournalConfig, JournalRecordLog, RecordLog, SyncMode};
use upi_store::{DiskObjectStore, InMemoryObjectStore, ObjectStore};

use crate::config::NodeConfig;
use crate::error::{InitError, NodeResult};

/// Handles to the storage a node operates on once ready.
#[derive(Clone)]
pub struct Session {
    pub store: Arc<dyn ObjectStore>,
    pub log: Arc<dyn RecordLog>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

/// Source of storage sessions.
///
/// `connect` performs the node's bootstrap. It is called at most once per
/// initialization attempt.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn connect(&self, config: &NodeConfig) -> NodeResult<Session>;

    /// Release a session. The default does nothing.
    async fn disconnect(&self, _session: &Session) -> NodeResult<()> {
        Ok(())
    }
}

/// Everything in process memory; contents are lost on drop.
#[derive(Clone, Copy, Debug, Default)]
pub struct MemoryBackend;

#[async_trait]
impl Backend for MemoryBackend {
    async fn connect(&self, config: &NodeConfig) -> NodeResult<Session> {
        debug!(log = %config.log_name, pubsub = config.pubsub, "memory backend connected");
        Ok(Session {
            store: Arc::new(InMemoryObjectStore::new()),
            log: Arc::new(InMemoryRecordLog::new(config.log_name.clone())),
        })
    }
}

/// Payloads and the journal under one directory:
///
/// ```text
/// <root>/objects/ab/cdef...
/// <root>/logs/<log_name>.journal
/// ```
#[derive(Clone, Debug)]
pub struct LocalBackend {
    root: PathBuf,
    sync_mode: SyncMode,
}

impl LocalBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            sync_mode: SyncMode::default(),
        }
    }

    pub fn with_sync_mode(mut self, sync_mode: SyncMode) -> Self {
        self.sync_mode = sync_mode;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl Backend for LocalBackend {
    async fn connect(&self, config: &NodeConfig) -> NodeResult<Session> {
        let root = self.root.clone();
        let log_name = config.log_name.clone();
        let journal = JournalConfig {
            sync_mode: self.sync_mode,
        };

        let session = tokio::task::spawn_blocking(move || -> NodeResult<Session> {
            let store = DiskObjectStore::open(&root)?;
            let log = JournalRecordLog::open(&root.join("logs"), &log_name, journal)?;
            Ok(Session {
                store: Arc::new(store),
                log: Arc::new(log),
            })
        })
        .await
        .map_err(|e| InitError::Backend(e.to_string()))??;

        info!(root = %self.root.display(), log = %config.log_name, "local backend connected");
        Ok(session)
    }
}

/// The backend a configuration selects: on disk when `data_dir` is set,
/// otherwise in memory.
pub fn backend_for(config: &NodeConfig) -> Arc<dyn Backend> {
    match &config.data_dir {
        Some(dir) => Arc::new(LocalBackend::new(dir)),
        None => Arc::new(MemoryBackend),
    }
}
