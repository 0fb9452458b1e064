use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{NodeError, NodeResult};

/// Node settings, fixed at construction.
///
/// ```toml
/// log_name = "upi-logs"
/// owner_key = "owner"
/// pubsub = true
/// init_timeout = 30      # seconds
/// data_dir = "/var/lib/upi"
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeConfig {
    /// Name of the record log.
    pub log_name: String,
    /// Metadata key used when a log query filters by owner without naming one.
    pub owner_key: String,
    /// Peer-to-peer messaging flag, passed through to the backend.
    pub pubsub: bool,
    #[serde(with = "duration_secs")]
    pub init_timeout: Duration,
    /// Root directory for on-disk storage; `None` keeps everything in memory.
    pub data_dir: Option<PathBuf>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            log_name: "upi-logs".into(),
            owner_key: upi_ledger::DEFAULT_OWNER_KEY.into(),
            pubsub: true,
            init_timeout: Duration::from_secs(30),
            data_dir: None,
        }
    }
}

impl NodeConfig {
    pub fn builder() -> NodeConfigBuilder {
        NodeConfigBuilder::default()
    }

    pub fn validate(&self) -> NodeResult<()> {
        if self.log_name.trim().is_empty() {
            return Err(NodeError::Config("log_name must not be empty".into()));
        }
        if self.owner_key.trim().is_empty() {
            return Err(NodeError::Config("owner_key must not be empty".into()));
        }
        if self.init_timeout.is_zero() {
            return Err(NodeError::Config("init_timeout must be positive".into()));
        }
        Ok(())
    }

    pub fn from_toml_str(text: &str) -> NodeResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| NodeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> NodeResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }
}

/// Overrides merged over [`NodeConfig::default`].
#[derive(Clone, Debug, Default)]
pub struct NodeConfigBuilder {
    config: NodeConfig,
}

impl NodeConfigBuilder {
    pub fn log_name(mut self, name: impl Into<String>) -> Self {
        self.config.log_name = name.into();
        self
    }

    pub fn owner_key(mut self, key: impl Into<String>) -> Self {
        self.config.owner_key = key.into();
        self
    }

    pub fn pubsub(mut self, enabled: bool) -> Self {
        self.config.pubsub = enabled;
        self
    }

    pub fn init_timeout(mut self, timeout: Duration) -> Self {
        self.config.init_timeout = timeout;
        self
    }

    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.data_dir = Some(dir.into());
        self
    }

    pub fn build(self) -> NodeResult<NodeConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
