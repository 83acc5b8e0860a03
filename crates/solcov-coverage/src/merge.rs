// SPDX-License-Identifier: AGPL-3.0

//! Report merging
//!
//! Coverage only ever grows when merging additional evidence: covered-index
//! sets are unioned across reports and the merged percentage is recomputed
//! from the union against the static map's weights, never averaged.

use crate::eval::{round2, ContractResults, CoverageReport, FunctionResult};
use crate::map::{CoverageMap, FunctionMap};
use std::collections::BTreeMap;

/// Merge one function's results across reports. `map` supplies the weights
/// for recomputing the percentage; without it (artifact gone since the
/// reports were written) the union is kept with the best input percentage.
pub fn merge_function(inputs: &[&FunctionResult], map: Option<&FunctionMap>) -> FunctionResult {
    if inputs.iter().any(|r| r.is_full()) {
        return FunctionResult::full();
    }

    let mut merged = FunctionResult::default();
    for input in inputs {
        merged.line.extend(input.line.iter().copied());
        merged.true_branches.extend(input.true_branches.iter().copied());
        merged.false_branches.extend(input.false_branches.iter().copied());
    }

    // a branch observed true in one report and false in another is fully
    // covered once the evidence is combined
    let both: Vec<usize> = merged
        .true_branches
        .intersection(&merged.false_branches)
        .copied()
        .collect();
    merged.line.extend(both);
    let fully = merged.line.clone();
    merged.true_branches.retain(|idx| !fully.contains(idx));
    merged.false_branches.retain(|idx| !fully.contains(idx));

    match map {
        Some(map) => {
            let units: usize = merged.line.iter().map(|&idx| map.weight_of(idx)).sum::<usize>()
                + merged.true_branches.len()
                + merged.false_branches.len();
            if units == map.total_weight {
                return FunctionResult::full();
            }
            merged.pct = round2(units as f64 / map.total_weight as f64);
        }
        None => {
            merged.pct = inputs.iter().map(|r| r.pct).fold(0.0, f64::max);
        }
    }
    merged
}

/// Merge per-test-file reports into one aggregate, keyed by contract,
/// source file, and function
pub fn merge_reports<'a>(
    reports: impl IntoIterator<Item = &'a CoverageReport>,
    skeleton: &CoverageMap,
) -> ContractResults {
    // gather every function's inputs across the reports
    let mut gathered: BTreeMap<(String, String, String), Vec<&FunctionResult>> = BTreeMap::new();
    for report in reports {
        for (contract, sources) in &report.contracts {
            for (source, functions) in sources {
                for (name, result) in functions {
                    gathered
                        .entry((contract.clone(), source.clone(), name.clone()))
                        .or_default()
                        .push(result);
                }
            }
        }
    }

    let mut merged: ContractResults = BTreeMap::new();
    for ((contract, source, name), inputs) in gathered {
        let map = skeleton.function_map(&contract, &source, &name);
        let result = merge_function(&inputs, map);
        merged
            .entry(contract)
            .or_default()
            .entry(source)
            .or_default()
            .insert(name, result);
    }
    merged
}
