use thiserror::Error;

/// Canonical Veloq error taxonomy used across crates.
///
/// Classification guidance:
/// - [`VeloqError::Unsupported`]: a type codec operation invoked for a native kind it does not handle
/// - [`VeloqError::IllegalState`]: operator/publication protocol violations
/// - [`VeloqError::InvalidArgument`]: malformed construction input
/// - [`VeloqError::IndexOutOfRange`]: out-of-bounds position access on a block
/// - [`VeloqError::CorruptEncoding`]: wire-format decode failures
/// - [`VeloqError::Io`]: raw filesystem IO failures from std APIs
#[derive(Debug, Error)]
pub enum VeloqError {
    /// A `Type` codec operation was invoked for a native kind it does not support.
    ///
    /// Examples:
    /// - `get_long` on a boolean block
    /// - fixed-width byte size queried on a variable-width type
    ///
    /// Indicates a mismatched Type/Block pairing. This is a contract
    /// violation by the caller, never a data error, and is unreachable for
    /// correctly matched pairs.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// Protocol violation in the operator or publication lifecycle.
    ///
    /// Examples:
    /// - `add_input` on an operator whose `needs_input()` is false
    /// - publishing a channel set that was already published
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// Malformed construction input.
    ///
    /// Examples:
    /// - page built from blocks with mismatched position counts
    /// - channel index outside the page's channel range
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Out-of-bounds position access on a block.
    #[error("position {position} out of range for block with {count} positions")]
    IndexOutOfRange {
        /// Requested position.
        position: usize,
        /// Number of addressable positions.
        count: usize,
    },

    /// Wire-format decode failure: truncated buffer, negative count, length
    /// sum mismatch, or an unregistered encoding name.
    ///
    /// Always surfaced to the caller; implies data corruption or a format
    /// mismatch between producer and consumer.
    #[error("corrupt encoding: {0}")]
    CorruptEncoding(String),

    /// Transparent std IO failures from spool files.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Standard Veloq result alias.
pub type Result<T> = std::result::Result<T, VeloqError>;
