use thiserror::Error;

/// Every failure in this crate is scoped to one call on one instance.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RcxiError {
    /// Invalid construction parameters.
    #[error("config error: {0}")]
    Config(String),

    /// Input vector dimension does not match the engine dimension.
    #[error("encoding error: expected dimension {expected}, got {actual}")]
    Encoding { expected: usize, actual: usize },

    /// An update produced a non-finite component. The engine has rolled back.
    #[error("numerical instability at sequence {sequence_index}: component {component} is not finite")]
    NumericalInstability {
        sequence_index: u64,
        component: usize,
    },

    /// Node index out of range.
    #[error("index error: node {index} out of range (len {len})")]
    Index { index: usize, len: usize },

    /// Requested capability is not attached.
    #[error("not available: {0}")]
    NotAvailable(String),

    /// Import payload is malformed or from an incompatible version.
    #[error("wire format error: {0}")]
    Wire(String),
}

impl RcxiError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn not_available(what: impl Into<String>) -> Self {
        Self::NotAvailable(what.into())
    }
}

pub type Result<T> = std::result::Result<T, RcxiError>;
