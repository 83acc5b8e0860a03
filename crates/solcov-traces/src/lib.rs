// SPDX-License-Identifier: AGPL-3.0

//! Execution trace data model and trace-dump parsing
//!
//! The test runner records, per transaction, the ordered sequence of executed
//! instructions together with source attribution, and dumps them as JSON.
//! This crate parses those dumps; it never executes anything itself.

use serde::{Deserialize, Serialize};
use solcov_constants::{
    OP_INVALID, OP_JUMP, OP_JUMPDEST, OP_JUMPI, OP_RETURN, OP_REVERT, OP_SELFDESTRUCT, OP_STOP,
};
use solcov_exceptions::{CovError, CovResult};
use std::path::Path;

/// Opaque identifier for one test run (the originating transaction hash).
/// Multiple hits from the same run count once.
pub type RunId = String;

/// One executed instruction with source attribution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TraceStep {
    pub pc: usize,
    pub op: u8,
    /// Contract the instruction belongs to; absent for synthetic or
    /// unattributable steps
    #[serde(default)]
    pub contract: Option<String>,
    /// Source file the instruction maps to
    #[serde(default)]
    pub source: Option<String>,
}

/// Ordered record of the instructions executed during one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trace {
    pub run: RunId,
    /// Destination contract address; absent for contract-creation-only
    /// transactions, which are excluded from line attribution
    #[serde(default)]
    pub receiver: Option<String>,
    #[serde(default)]
    pub steps: Vec<TraceStep>,
}

impl Trace {
    pub fn new(run: RunId, receiver: Option<String>, steps: Vec<TraceStep>) -> Self {
        Self {
            run,
            receiver,
            steps,
        }
    }

    /// A trace with no destination contributes nothing to coverage
    pub fn has_receiver(&self) -> bool {
        self.receiver.is_some()
    }
}

/// Parse a trace-dump file (one JSON array of traces per test file)
pub fn load_trace_file(path: &Path) -> CovResult<Vec<Trace>> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| CovError::parsing(path.display().to_string(), e.to_string()))
}

/// Get mnemonic for opcode
pub fn mnemonic(opcode: u8) -> &'static str {
    match opcode {
        OP_STOP => "STOP",
        OP_JUMP => "JUMP",
        OP_JUMPI => "JUMPI",
        OP_JUMPDEST => "JUMPDEST",
        OP_RETURN => "RETURN",
        OP_REVERT => "REVERT",
        OP_INVALID => "INVALID",
        OP_SELFDESTRUCT => "SELFDESTRUCT",
        _ => "UNKNOWN",
    }
}
