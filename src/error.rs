use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Inconsistencies in what the engines reported, as opposed to engine failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolFault {
    #[error("{engine}: output closed before a node total line was seen")]
    Unterminated { engine: String },

    #[error("totals matched unexpectedly at depth {depth} after [{}]", .chain.join(" "))]
    UnexpectedAgreement { depth: u32, chain: Vec<String>, total: u64 },

    #[error("totals differ at depth {depth} after [{}] ({total_a} vs {total_b}) but every move count matches", .chain.join(" "))]
    NoMoveDiscrepancy { depth: u32, chain: Vec<String>, total_a: u64, total_b: u64 },
}

#[derive(Debug, Error)]
pub enum BisectError {
    #[error("failed to launch engine at {}: {source}", .path.display())]
    Spawn { path: PathBuf, #[source] source: std::io::Error },

    #[error("{engine}: engine process exited unexpectedly")]
    ProcessExited { engine: String },

    #[error("{engine}: no response within {waited:?}")]
    Timeout { engine: String, waited: Duration },

    #[error("tooling/parsing inconsistency: {0}")]
    Protocol(#[from] ProtocolFault),

    #[error("depth must be at least 1, got {0}")]
    InvalidDepth(u32),

    #[error("configuration error: {0}")]
    Config(String),
}

impl BisectError {
    /// True when the run failed because of the tooling rather than an engine.
    pub fn is_tooling_fault(&self) -> bool {
        matches!(self, BisectError::Protocol(_))
    }
}

pub type Result<T, E = BisectError> = std::result::Result<T, E>;
