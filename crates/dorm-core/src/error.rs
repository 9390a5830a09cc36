//! Kernel error types.

use thiserror::Error;

/// Errors raised by the catalog kernel.
///
/// Checker violations are not errors: the checker collects every violation
/// into a [`crate::diag::CheckReport`] instead of failing on the first one.
/// The variants here abort the current operation.
#[derive(Debug, Error)]
pub enum Error {
    /// An input document could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// A name does not resolve to any atom or hyperedge.
    #[error("unknown name '{0}'")]
    UnknownName(String),

    /// A query (or one of its parts) is not connected in the domain graph.
    #[error("disconnected: {0}")]
    Disconnected(String),

    /// More than one minimal path exists and the tie-break does not resolve it.
    #[error("ambiguous path between '{from}' and '{to}'")]
    AmbiguousPath {
        /// Start atom name.
        from: String,
        /// End atom name.
        to: String,
    },

    /// Generalization expansion of a query produced no usable branch.
    #[error("empty expansion: {0}")]
    EmptyExpansion(String),

    /// A predicate references an attribute of a class absent from the pattern.
    #[error("dangling predicate: {0}")]
    DanglingPredicate(String),

    /// The sink rejected a statement; `index` is the position in the batch.
    #[error("sink error at statement {index}: {message}")]
    Sink {
        /// Index of the failing statement within the batch.
        index: usize,
        /// Message reported by the sink.
        message: String,
    },

    /// Cooperative cancellation was requested between statements.
    #[error("cancelled")]
    Cancelled,

    /// Source and target of a migration describe different domains.
    #[error("domain mismatch: source '{source_domain}' vs target '{target}'")]
    DomainMismatch {
        /// Domain name of the migration source.
        source_domain: String,
        /// Domain name of the migration target.
        target: String,
    },

    /// The migration source is not annotated as containing data.
    #[error("source '{0}' is not annotated as containing data")]
    SourceNotPopulated(String),

    /// Catalog blob serialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Catalog blob deserialization failed.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// An internal invariant did not hold; indicates a kernel bug.
    #[error("internal assertion: {0}")]
    Internal(String),
}

impl Error {
    /// Numeric family of this error, used by callers to derive exit codes.
    pub fn family(&self) -> u8 {
        match self {
            Error::Parse(_) | Error::UnknownName(_) => 2,
            Error::Disconnected(_)
            | Error::AmbiguousPath { .. }
            | Error::EmptyExpansion(_)
            | Error::DanglingPredicate(_)
            | Error::DomainMismatch { .. }
            | Error::SourceNotPopulated(_) => 3,
            Error::Sink { .. } | Error::Serialization(_) | Error::Deserialization(_) => 4,
            Error::Cancelled => 5,
            Error::Internal(_) => 6,
        }
    }
}
