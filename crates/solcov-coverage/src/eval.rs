// SPDX-License-Identifier: AGPL-3.0

//! Coverage evaluation
//!
//! Converts accumulated run sets into per-function results. A line with a
//! conditional jump weighs 2 (true and false outcomes count separately);
//! observing both outcomes, or hitting a plain line, earns the full weight.

use crate::map::FunctionMap;
use crate::record::FunctionHits;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Per-function coverage result. Fully covered functions collapse to
/// `{"pct": 1}`; the index sets are only reported while coverage is
/// incomplete.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FunctionResult {
    /// Indices of fully covered lines
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub line: BTreeSet<usize>,
    /// Indices of branch lines where only the true outcome was observed
    #[serde(rename = "true", default, skip_serializing_if = "BTreeSet::is_empty")]
    pub true_branches: BTreeSet<usize>,
    /// Indices of branch lines where only the false outcome was observed
    #[serde(rename = "false", default, skip_serializing_if = "BTreeSet::is_empty")]
    pub false_branches: BTreeSet<usize>,
    pub pct: f64,
}

impl FunctionResult {
    /// A function that was never hit
    pub fn zero() -> Self {
        Self::default()
    }

    /// A fully covered function, detail sets dropped
    pub fn full() -> Self {
        Self {
            pct: 1.0,
            ..Self::default()
        }
    }

    pub fn is_full(&self) -> bool {
        self.pct == 1.0
    }
}

/// Results keyed contract -> source file -> function
pub type ContractResults = BTreeMap<String, BTreeMap<String, BTreeMap<String, FunctionResult>>>;

/// Coverage report for one test file, plus content hashes of the implicated
/// artifacts for downstream change detection
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CoverageReport {
    pub contracts: ContractResults,
    #[serde(default)]
    pub sha1: BTreeMap<String, String>,
}

/// Round to two decimal places
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Score one function's accumulated hits against its static map
pub fn evaluate_function(map: &FunctionMap, hits: &FunctionHits) -> FunctionResult {
    if hits.lines.iter().all(|line| line.hits.is_empty()) {
        return FunctionResult::zero();
    }

    let mut units = 0usize;
    let mut result = FunctionResult::default();

    for (idx, (spec, line)) in map.lines.iter().zip(&hits.lines).enumerate() {
        if line.hits.is_empty() {
            continue;
        }
        if spec.jump_pc.is_none() {
            units += spec.weight();
            result.line.insert(idx);
            continue;
        }
        let trues = line.trues.len();
        let falses = line.falses.len();
        if trues > 0 && falses > 0 {
            units += spec.weight();
            result.line.insert(idx);
            continue;
        }
        // one observed outcome earns one of the branch's two units;
        // a hit branch with no classified outcome earns nothing
        if trues > 0 {
            units += 1;
            result.true_branches.insert(idx);
        }
        if falses > 0 {
            units += 1;
            result.false_branches.insert(idx);
        }
    }

    if units == map.total_weight {
        return FunctionResult::full();
    }
    result.pct = round2(units as f64 / map.total_weight as f64);
    result
}
