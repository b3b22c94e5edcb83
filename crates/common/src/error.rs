use thiserror::Error;

/// Canonical varve error taxonomy used across crates.
///
/// Classification guidance:
/// - [`VarveError::Domain`]: predicate shapes or translator inputs the scan engine cannot express
/// - [`VarveError::Range`]: unsigned64 arithmetic/cast overflow, surfaced with the offending value
/// - [`VarveError::Transport`] / [`VarveError::Io`]: channel connect/send/receive failures
/// - [`VarveError::Decode`]: malformed or truncated reply bytes, with byte-offset context
/// - [`VarveError::TypeMismatch`]: cursor field access against the wrong logical type
/// - [`VarveError::InvalidConfig`]: config/URL/split-count contract violations
/// - [`VarveError::Unsupported`]: valid requests for intentionally unimplemented behavior
#[derive(Debug, Error)]
pub enum VarveError {
    /// Unsupported predicate shape or malformed translator input.
    ///
    /// Examples:
    /// - discrete-value domains (known gap, fail fast)
    /// - operand type not matching the column's storage type
    /// - cursor contract violations (read before advance, missing reply column)
    #[error("domain error: {0}")]
    Domain(String),

    /// Unsigned64 arithmetic or cast left the representable range.
    ///
    /// Never produced by silent wrapping; the message names the operands.
    #[error("numeric value out of range: {0}")]
    Range(String),

    /// Channel connect/send/receive failure.
    ///
    /// Fatal for the split it belongs to; retry policy, if any, lives in the
    /// connection layer above this crate.
    #[error("transport error: {0}")]
    Transport(String),

    /// Transparent std IO failures (socket reads/writes, timeouts).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed reply bytes; callers treat this like a transport fault.
    #[error("decode error: {0}")]
    Decode(String),

    /// Field accessor called against the wrong logical type.
    ///
    /// A programming-contract violation, always fatal, never recovered.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// Invalid or inconsistent configuration state.
    ///
    /// Examples:
    /// - zero split count
    /// - unknown channel URL scheme
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Valid request for a feature not implemented in the current protocol version.
    ///
    /// Examples:
    /// - multi-group OR trees on the wire
    /// - double-typed field access
    #[error("unsupported: {0}")]
    Unsupported(String),
}

/// Standard varve result alias.
pub type Result<T> = std::result::Result<T, VarveError>;
