//! Error types for bit reading and spec execution.

use thiserror::Error;

/// Errors produced by a [crate::bit_reader::BitReader].
///
/// Width checks happen before the reader is touched, so a
/// [ReadError::TooManyBits] leaves the cursor exactly where it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    /// More bits were requested than the method can return.
    #[error("requested {requested} bits, this read supports at most {max}")]
    TooManyBits { requested: usize, max: usize },
    /// The reader ran past the end of its buffer earlier and cannot read any more.
    #[error("reader is exhausted")]
    Exhausted,
    /// A byte-aligned operation was attempted in the middle of a byte.
    #[error("reader is not byte aligned (bit index {bit_index})")]
    Unaligned { bit_index: u8 },
    /// Internal cursor invariant violated.
    #[error("invalid reader state: {0}")]
    InvalidState(&'static str),
    /// Requested byte range is beyond the end of the data.
    #[error("{requested} bytes requested at byte index {byte_index}, only {available} available")]
    OutOfBounds {
        byte_index: usize,
        requested: usize,
        available: usize,
    },
}

/// Errors aborting a [crate::spec::Spec] decode.
///
/// There is no partial result: whatever was decoded before the error is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error(transparent)]
    Read(#[from] ReadError),
    /// A builder-declared assertion evaluated to false.
    #[error("decode assertion failed: {0}")]
    Assertion(String),
    /// Raised by user-supplied step logic.
    #[error("{0}")]
    Custom(String),
}

impl DecodeError {
    pub fn custom(message: impl Into<String>) -> Self {
        DecodeError::Custom(message.into())
    }
}
