use crate::error::{BisectError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_HANDSHAKE_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 120_000;
pub const DEFAULT_QUIT_GRACE_MS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Label used in logs and reports
    pub name: String,
    pub path: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
}

impl EngineConfig {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self { name: name.into(), path: path.into(), args: Vec::new() }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

/// Timing bounds applied to every engine in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub handshake_timeout_ms: u64,
    pub read_timeout_ms: u64,
    pub quit_grace_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            handshake_timeout_ms: DEFAULT_HANDSHAKE_TIMEOUT_MS,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            quit_grace_ms: DEFAULT_QUIT_GRACE_MS,
        }
    }
}

impl Timeouts {
    pub fn handshake(&self) -> Duration { Duration::from_millis(self.handshake_timeout_ms) }
    pub fn read(&self) -> Duration { Duration::from_millis(self.read_timeout_ms) }
    pub fn quit_grace(&self) -> Duration { Duration::from_millis(self.quit_grace_ms) }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub engine_a: EngineConfig,
    pub engine_b: EngineConfig,
    #[serde(flatten)]
    pub timeouts: Timeouts,
}

impl SessionConfig {
    pub fn new(engine_a: EngineConfig, engine_b: EngineConfig) -> Self {
        Self { engine_a, engine_b, timeouts: Timeouts::default() }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| BisectError::Config(format!("read {}: {e}", path.display())))?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(text).map_err(|e| BisectError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        for engine in [&self.engine_a, &self.engine_b] {
            if engine.path.as_os_str().is_empty() {
                return Err(BisectError::Config(format!("engine '{}' has an empty path", engine.name)));
            }
        }
        if self.timeouts.read_timeout_ms == 0 || self.timeouts.handshake_timeout_ms == 0 {
            return Err(BisectError::Config("timeouts must be non-zero".into()));
        }
        Ok(())
    }
}
