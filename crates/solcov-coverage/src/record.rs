// SPDX-License-Identifier: AGPL-3.0

//! Trace recording
//!
//! Replays execution traces against the coverage-map skeleton, attributing
//! every matched instruction to a source line and classifying conditional
//! jump outcomes from the address of the following instruction. Instructions
//! with no map entry are expected (optimizer artifacts, untracked library
//! bytecode) and skipped without complaint.

use crate::eval::{evaluate_function, ContractResults, CoverageReport};
use crate::map::{ContractMap, MapSource};
use solcov_constants::OP_JUMPI;
use solcov_exceptions::{CovError, CovResult};
use solcov_traces::{mnemonic, RunId, Trace};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Mutable hit state of one source line, index-parallel to the skeleton's
/// `FunctionMap::lines`
#[derive(Debug, Clone, Default)]
pub struct LineHits {
    /// Runs that executed this line
    pub hits: HashSet<RunId>,
    /// Runs that observed the branch resolve true (jump taken)
    pub trues: HashSet<RunId>,
    /// Runs that observed the branch resolve false (fall-through)
    pub falses: HashSet<RunId>,
}

/// Hit state of one function
#[derive(Debug, Clone, Default)]
pub struct FunctionHits {
    pub lines: Vec<LineHits>,
}

impl FunctionHits {
    fn sized(lines: usize) -> Self {
        Self {
            lines: vec![LineHits::default(); lines],
        }
    }
}

/// One contract's skeleton plus its hit state
#[derive(Debug, Clone)]
struct ContractEntry {
    map: ContractMap,
    hits: BTreeMap<String, BTreeMap<String, FunctionHits>>,
}

impl ContractEntry {
    fn new(map: ContractMap) -> Self {
        let hits = map
            .sources
            .iter()
            .map(|(source, unit)| {
                let per_fn = unit
                    .functions
                    .iter()
                    .map(|(name, f)| (name.clone(), FunctionHits::sized(f.lines.len())))
                    .collect();
                (source.clone(), per_fn)
            })
            .collect();
        Self { map, hits }
    }
}

/// Records traces into per-line run sets, loading each contract's coverage
/// map on first mention. One recorder covers one test file's traces; hand it
/// to the evaluator only after every trace has been recorded.
pub struct Recorder<S> {
    loader: S,
    contracts: BTreeMap<String, ContractEntry>,
    // contracts with no artifact, so we only warn once
    unknown: BTreeSet<String>,
}

impl<S: MapSource> Recorder<S> {
    pub fn new(loader: S) -> Self {
        Self {
            loader,
            contracts: BTreeMap::new(),
            unknown: BTreeSet::new(),
        }
    }

    fn entry_mut(&mut self, contract: &str) -> CovResult<Option<&mut ContractEntry>> {
        if self.unknown.contains(contract) {
            return Ok(None);
        }
        if !self.contracts.contains_key(contract) {
            match self.loader.load(contract)? {
                Some(map) => {
                    self.contracts
                        .insert(contract.to_string(), ContractEntry::new(map));
                }
                None => {
                    self.unknown.insert(contract.to_string());
                    return Ok(None);
                }
            }
        }
        Ok(self.contracts.get_mut(contract))
    }

    /// Replay one trace, attributing every matched instruction to a line.
    /// Outcome classification depends on adjacency within this trace, so the
    /// steps must be processed in execution order.
    pub fn record_trace(&mut self, trace: &Trace) -> CovResult<()> {
        if !trace.has_receiver() {
            tracing::debug!(run = %trace.run, "skipping trace with no destination contract");
            return Ok(());
        }

        for i in 0..trace.steps.len() {
            let step = &trace.steps[i];
            let (Some(contract), Some(source)) = (&step.contract, &step.source) else {
                continue;
            };

            let Some(entry) = self.entry_mut(contract)? else {
                continue;
            };
            let ContractEntry { map, hits } = entry;

            let Some(unit) = map.sources.get(source) else {
                continue;
            };
            let Some((fn_name, fmap)) = unit.function_for_pc(step.pc) else {
                tracing::trace!(
                    pc = step.pc,
                    op = mnemonic(step.op),
                    contract = %contract,
                    "instruction outside the coverage map"
                );
                continue;
            };

            let fhits = hits
                .get_mut(source)
                .and_then(|fns| fns.get_mut(fn_name))
                .ok_or_else(|| {
                    CovError::Internal(format!("missing hit state for {}:{}", contract, fn_name))
                })?;

            if step.op != OP_JUMPI {
                if let Some(idx) = fmap.line_for_pc(step.pc) {
                    fhits.lines[idx].hits.insert(trace.run.clone());
                }
                continue;
            }

            // a jump outcome is only meaningful once the jump itself has
            // been recorded as a hit for this run
            let Some(idx) = fmap.line_for_jump(step.pc) else {
                continue;
            };
            if !fhits.lines[idx].hits.contains(&trace.run) {
                continue;
            }
            let Some(next) = trace.steps.get(i + 1) else {
                continue;
            };
            if next.pc == step.pc + 1 {
                fhits.lines[idx].falses.insert(trace.run.clone());
            } else {
                fhits.lines[idx].trues.insert(trace.run.clone());
            }
        }

        Ok(())
    }

    /// Replay a batch of traces in order
    pub fn record_all<'a>(&mut self, traces: impl IntoIterator<Item = &'a Trace>) -> CovResult<()> {
        for trace in traces {
            self.record_trace(trace)?;
        }
        Ok(())
    }

    /// Convert the accumulated state into a report (the caller attaches
    /// content hashes)
    pub fn evaluate(&self) -> CoverageReport {
        let mut contracts: ContractResults = BTreeMap::new();
        for (contract, entry) in &self.contracts {
            for (source, unit) in &entry.map.sources {
                for (name, fmap) in &unit.functions {
                    let fhits = entry
                        .hits
                        .get(source)
                        .and_then(|fns| fns.get(name))
                        .cloned()
                        .unwrap_or_default();
                    contracts
                        .entry(contract.clone())
                        .or_default()
                        .entry(source.clone())
                        .or_default()
                        .insert(name.clone(), evaluate_function(fmap, &fhits));
                }
            }
        }
        CoverageReport {
            contracts,
            sha1: BTreeMap::new(),
        }
    }

    /// The union skeleton of every contract loaded so far
    pub fn into_map(self) -> crate::map::CoverageMap {
        let mut map = crate::map::CoverageMap::new();
        for (contract, entry) in self.contracts {
            map.insert(contract, entry.map);
        }
        map
    }
}
