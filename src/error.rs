//! Crate-wide error type.
//!
//! All decode/encode failures are reported as variants of [`IrError`]. The
//! repeat-sentinel control-flow signals (`RepeatLeadIn`, `RepeatLeadOut`,
//! `RepeatTimeoutExpired`) are *not* folded into this type: they are not
//! failures, they're outcomes a caller opted into by using repeat-aware
//! decoding. See [`crate::session::DecodeOutcome`].

use thiserror::Error;

/// Errors produced while decoding or encoding an IR burst.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IrError {
    /// The stream did not start with a recognised lead-in.
    ///
    /// Carries the observed duration that failed to match.
    #[error("lead-in mismatch at duration {0}")]
    LeadInError(i64),

    /// The stream did not end with a recognised lead-out.
    #[error("lead-out mismatch: {0}")]
    LeadOutError(String),

    /// The body could not be decoded into bit pairs.
    #[error("IR stream body error: {0}")]
    IRStreamError(String),

    /// Bits decoded, but a protocol-level validation failed (checksum,
    /// out-of-range field, static-field mismatch).
    #[error("decode error: {0}")]
    DecodeError(String),

    /// An `encode()` argument fell outside its declared `encode_fields`
    /// range.
    #[error("argument {name} = {value} out of range [{min}, {max}]")]
    EncodeRangeError {
        /// Argument name.
        name: &'static str,
        /// Supplied value.
        value: u64,
        /// Inclusive lower bound.
        min: u64,
        /// Inclusive upper bound.
        max: u64,
    },

    /// The named protocol is not present in the registry.
    #[error("unknown protocol {0}")]
    UnknownProtocol(String),

    /// A field name was requested that the protocol does not declare.
    #[error("unknown field {0}")]
    UnknownField(String),

    /// Pronto text could not be parsed (bad hex, wrong word count, unknown
    /// sub-format selector).
    #[error("invalid Pronto code: {0}")]
    InvalidPronto(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, IrError>;
