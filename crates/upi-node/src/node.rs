use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};
use upi_ledger::{LedgerError, LogEntry, LogQuery, LogRecord, LogValidator, ValidationReport};
use upi_types::{ContentAddress, Upi};

use crate::backend::{backend_for, Backend, MemoryBackend};
use crate::config::NodeConfig;
use crate::error::{InitError, NodeError, NodeResult, NodeState};
use crate::lifecycle::{self, LifecycleCell, Step};

/// A storage node: content-addressed payloads plus an append-only record log.
///
/// Every operation other than `initialize` requires the node to be ready.
/// The `add_*` / `retrieve_*` methods take loosely typed input and answer
/// malformed input with `None` or `false` instead of an error; precondition
/// and storage failures are still errors.
pub struct Node {
    config: NodeConfig,
    backend: Arc<dyn Backend>,
    lifecycle: LifecycleCell,
}

impl Node {
    pub fn new(config: NodeConfig, backend: Arc<dyn Backend>) -> NodeResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            backend,
            lifecycle: LifecycleCell::new(),
        })
    }

    /// A node whose backend is chosen by `config.data_dir`.
    pub fn open(config: NodeConfig) -> NodeResult<Self> {
        let backend = backend_for(&config);
        Self::new(config, backend)
    }

    pub fn in_memory() -> Self {
        Self {
            config: NodeConfig::default(),
            backend: Arc::new(MemoryBackend),
            lifecycle: LifecycleCell::new(),
        }
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn state(&self) -> NodeState {
        self.lifecycle.state()
    }

    pub fn is_initialized(&self) -> bool {
        self.state() == NodeState::Ready
    }

    /// Error of the last failed initialization, while the node is `Failed`.
    pub fn last_init_error(&self) -> Option<InitError> {
        self.lifecycle.last_error()
    }

    /// Bring the node to `Ready`.
    ///
    /// Concurrent callers share one bootstrap and all observe its outcome.
    /// Once ready, further calls return immediately. After a failure, the
    /// next call starts a fresh attempt.
    pub async fn initialize(&self) -> NodeResult<()> {
        let attempt = match self.lifecycle.begin()? {
            Step::Done => return Ok(()),
            Step::Wait(rx) => {
                debug!("waiting on in-flight initialization");
                return lifecycle::wait(rx).await.map_err(NodeError::from);
            }
            Step::Run(attempt) => attempt,
        };

        info!(log = %self.config.log_name, "initializing node");
        let timeout = self.config.init_timeout;
        let outcome = match tokio::time::timeout(timeout, self.backend.connect(&self.config)).await
        {
            Ok(Ok(session)) => Ok(session),
            Ok(Err(e)) => Err(InitError::Backend(e.to_string())),
            Err(_) => Err(InitError::Timeout(timeout)),
        };

        match attempt.complete(outcome) {
            Ok(()) => {
                info!(log = %self.config.log_name, "node ready");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "node initialization failed");
                Err(e.into())
            }
        }
    }

    /// Release storage and move to `Disconnected`. Only valid when ready.
    pub async fn disconnect(&self) -> NodeResult<()> {
        let session = self.lifecycle.disconnect()?;
        self.backend.disconnect(&session).await?;
        info!("node disconnected");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Typed operations
    // ------------------------------------------------------------------

    pub async fn put(&self, data: &[u8]) -> NodeResult<ContentAddress> {
        let session = self.lifecycle.session("put")?;
        Ok(session.store.put(data)?)
    }

    pub async fn get(&self, address: &ContentAddress) -> NodeResult<Option<Vec<u8>>> {
        let session = self.lifecycle.session("get")?;
        Ok(session.store.get(address)?)
    }

    pub async fn append(&self, entry: LogEntry) -> NodeResult<LogRecord> {
        let session = self.lifecycle.session("append")?;
        Ok(session.log.append(entry)?)
    }

    /// Records matching `query`. An owner filter without an explicit key
    /// uses the configured `owner_key`.
    pub async fn records(&self, query: &LogQuery) -> NodeResult<Vec<LogRecord>> {
        let session = self.lifecycle.session("iterate")?;
        Ok(session.log.records(&self.scoped(query))?)
    }

    pub async fn iterate(&self, query: &LogQuery) -> NodeResult<Vec<LogEntry>> {
        let session = self.lifecycle.session("iterate")?;
        Ok(session.log.entries(&self.scoped(query))?)
    }

    /// Every entry owned by `owner`, in append order.
    pub async fn logs_by_owner(&self, owner: &str) -> NodeResult<Vec<LogEntry>> {
        self.iterate(&LogQuery::owner(owner)).await
    }

    pub async fn verify_log(&self) -> NodeResult<ValidationReport> {
        let session = self.lifecycle.session("verify")?;
        let report = LogValidator::validate_log(session.log.as_ref())?;
        if !report.is_valid() {
            warn!(violations = report.violations.len(), "log failed validation");
        }
        Ok(report)
    }

    fn scoped(&self, query: &LogQuery) -> LogQuery {
        let mut query = query.clone();
        if query.owner_key.is_none() {
            query.owner_key = Some(self.config.owner_key.clone());
        }
        query
    }

    // ------------------------------------------------------------------
    // Loosely typed boundary
    // ------------------------------------------------------------------

    /// Store a non-empty string payload. `None` if `data` is anything else.
    pub async fn add_data(&self, data: &Value) -> NodeResult<Option<ContentAddress>> {
        let Some(text) = non_empty_str(data) else {
            debug!("add_data rejected: not a non-empty string");
            return Ok(None);
        };
        self.put(text.as_bytes()).await.map(Some)
    }

    /// Fetch a payload by its hex address. `None` if the address is malformed
    /// or nothing is stored under it.
    pub async fn retrieve_data(&self, address: &Value) -> NodeResult<Option<Vec<u8>>> {
        let Some(address) = non_empty_str(address).and_then(|s| s.parse::<ContentAddress>().ok())
        else {
            debug!("retrieve_data rejected: not a content address");
            return Ok(None);
        };
        self.get(&address).await
    }

    /// Append `{id, hash, meta}`. `false` if `id` is not a UPI, `hash` is not a
    /// content address, `meta` is neither an object nor `null`, or the log
    /// refuses the entry (for instance because it is too large to persist).
    pub async fn add_log(&self, id: &Value, hash: &Value, meta: &Value) -> NodeResult<bool> {
        let Some(entry) = parse_entry(id, hash, meta) else {
            debug!("add_log rejected: malformed entry");
            return Ok(false);
        };
        match self.append(entry).await {
            Ok(_) => Ok(true),
            Err(NodeError::Ledger(LedgerError::Validation(reason))) => {
                debug!(%reason, "add_log rejected by the record log");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn retrieve_logs(&self, query: &LogQuery) -> NodeResult<Vec<LogEntry>> {
        self.iterate(query).await
    }
}

fn non_empty_str(value: &Value) -> Option<&str> {
    value.as_str().filter(|s| !s.is_empty())
}

fn parse_entry(id: &Value, hash: &Value, meta: &Value) -> Option<LogEntry> {
    let id: Upi = non_empty_str(id)?.parse().ok()?;
    let hash: ContentAddress = non_empty_str(hash)?.parse().ok()?;
    let meta = LogEntry::meta_from_value(meta).ok()?;
    LogEntry::new(id, hash, meta).ok()
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("log_name", &self.config.log_name)
            .field("state", &self.state())
            .finish()
    }
}
