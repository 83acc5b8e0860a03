// SPDX-License-Identifier: AGPL-3.0

//! Coverage analysis errors
//!
//! Unattributable trace data is never an error (partial coverage is still
//! useful); these variants cover malformed inputs and broken invariants.

use thiserror::Error;

/// Errors raised while loading maps, parsing inputs, or on invariant breaks
#[derive(Error, Debug)]
pub enum CovError {
    /// A coverage-map skeleton violates a structural invariant. This is a
    /// programming/build defect, not a user error, and is not recoverable.
    #[error("Invalid coverage map for {contract}: {reason}")]
    InvalidMap { contract: String, reason: String },

    #[error("Failed to parse {path}: {reason}")]
    ParsingError { path: String, reason: String },

    #[error("Invalid range: {0}. Must be an integer or slice (eg. 1:4)")]
    InvalidRange(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CovError {
    /// Shorthand for map-invariant violations
    pub fn invalid_map(contract: impl Into<String>, reason: impl Into<String>) -> Self {
        CovError::InvalidMap {
            contract: contract.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for parse failures
    pub fn parsing(path: impl Into<String>, reason: impl Into<String>) -> Self {
        CovError::ParsingError {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for coverage operations
pub type CovResult<T> = Result<T, CovError>;
