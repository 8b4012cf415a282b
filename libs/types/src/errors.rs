//! Error types for the shared primitives

use thiserror::Error;

/// Failure to parse a textual identity or signature.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid hex encoding: {0}")]
    InvalidHex(String),

    #[error("wrong length: expected {expected} bytes, got {actual}")]
    WrongLength { expected: usize, actual: usize },
}
