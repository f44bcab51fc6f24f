use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    /// The caller sealed against a hash that is no longer the chain tip.
    #[error("stale tip: expected previous hash {expected}, got {got}")]
    StaleTip { expected: String, got: String },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("broken chain link at block {index}")]
    BrokenLink { index: u64 },
}
