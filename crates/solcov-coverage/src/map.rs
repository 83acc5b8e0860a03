// SPDX-License-Identifier: AGPL-3.0

//! Immutable coverage-map skeleton
//!
//! The loader builds this structure once per contract from build artifacts;
//! the recorder never mutates it. Program-counter lookups go through sorted
//! indices built here, which requires (and verifies) that pc sets are
//! disjoint across lines within a function and across functions within a
//! source unit.

use solcov_build::{ArtifactDir, BuildArtifact, RawFunctionMap};
use solcov_constants::{BRANCH_WEIGHT, LINE_WEIGHT};
use solcov_exceptions::{CovError, CovResult};
use std::collections::{BTreeMap, BTreeSet};

/// Program counters of one source line, with the conditional-jump pc for
/// branching lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineSpec {
    pub pcs: BTreeSet<usize>,
    pub jump_pc: Option<usize>,
}

impl LineSpec {
    pub fn new(pcs: impl IntoIterator<Item = usize>, jump_pc: Option<usize>) -> Self {
        Self {
            pcs: pcs.into_iter().collect(),
            jump_pc,
        }
    }

    /// A branch counts its true and false outcomes separately
    pub fn weight(&self) -> usize {
        if self.jump_pc.is_some() {
            BRANCH_WEIGHT
        } else {
            LINE_WEIGHT
        }
    }
}

/// Static coverage map of one function
#[derive(Debug, Clone)]
pub struct FunctionMap {
    pub pcs: BTreeSet<usize>,
    pub lines: Vec<LineSpec>,
    pub total_weight: usize,
    // sorted (pc, line index) for binary-search lookup
    line_pcs: Vec<(usize, usize)>,
    jump_pcs: Vec<(usize, usize)>,
}

impl FunctionMap {
    /// Build a function map, verifying its structural invariants. `owner` is
    /// used in error messages ("Contract:function").
    pub fn new(
        owner: &str,
        pcs: BTreeSet<usize>,
        lines: Vec<LineSpec>,
        total_weight: usize,
    ) -> CovResult<Self> {
        let mut line_index: BTreeMap<usize, usize> = BTreeMap::new();
        let mut jump_index: BTreeMap<usize, usize> = BTreeMap::new();

        for (idx, line) in lines.iter().enumerate() {
            for &pc in &line.pcs {
                if !pcs.contains(&pc) {
                    return Err(CovError::invalid_map(
                        owner,
                        format!("line pc {} outside the function's pc set", pc),
                    ));
                }
                if line_index.insert(pc, idx).is_some() {
                    return Err(CovError::invalid_map(
                        owner,
                        format!("pc {} mapped to multiple lines", pc),
                    ));
                }
            }
            if let Some(jump_pc) = line.jump_pc {
                // first-match semantics: keep the earliest line for a jump pc
                jump_index.entry(jump_pc).or_insert(idx);
            }
        }

        let weights: usize = lines.iter().map(LineSpec::weight).sum();
        if weights != total_weight {
            return Err(CovError::invalid_map(
                owner,
                format!(
                    "total weight {} does not match line weights {}",
                    total_weight, weights
                ),
            ));
        }

        Ok(Self {
            pcs,
            lines,
            total_weight,
            line_pcs: line_index.into_iter().collect(),
            jump_pcs: jump_index.into_iter().collect(),
        })
    }

    /// Convert a raw artifact entry into a validated map
    pub fn from_raw(owner: &str, raw: &RawFunctionMap) -> CovResult<Self> {
        let lines = raw
            .line
            .iter()
            .map(|l| LineSpec::new(l.pc.iter().copied(), l.jump))
            .collect();
        Self::new(
            owner,
            raw.fn_info.pc.iter().copied().collect(),
            lines,
            raw.total,
        )
    }

    pub fn contains_pc(&self, pc: usize) -> bool {
        self.pcs.contains(&pc)
    }

    /// Index of the line owning this pc, if any
    pub fn line_for_pc(&self, pc: usize) -> Option<usize> {
        self.line_pcs
            .binary_search_by_key(&pc, |entry| entry.0)
            .ok()
            .map(|at| self.line_pcs[at].1)
    }

    /// Index of the line whose conditional jump sits at this pc, if any
    pub fn line_for_jump(&self, pc: usize) -> Option<usize> {
        self.jump_pcs
            .binary_search_by_key(&pc, |entry| entry.0)
            .ok()
            .map(|at| self.jump_pcs[at].1)
    }

    /// Weight of the line at `idx` (out-of-range indices default to a plain
    /// line so stale reports never panic the merger)
    pub fn weight_of(&self, idx: usize) -> usize {
        self.lines.get(idx).map_or(LINE_WEIGHT, LineSpec::weight)
    }
}

/// Coverage maps of every function in one source file
#[derive(Debug, Clone)]
pub struct SourceUnit {
    pub functions: BTreeMap<String, FunctionMap>,
    // sorted (pc, function name) across the unit
    fn_pcs: Vec<(usize, String)>,
}

impl SourceUnit {
    /// Build a source unit, verifying function pc sets are disjoint
    pub fn new(contract: &str, functions: BTreeMap<String, FunctionMap>) -> CovResult<Self> {
        let mut index: BTreeMap<usize, String> = BTreeMap::new();
        for (name, map) in &functions {
            for &pc in &map.pcs {
                if let Some(other) = index.insert(pc, name.clone()) {
                    return Err(CovError::invalid_map(
                        contract,
                        format!("pc {} belongs to both {} and {}", pc, other, name),
                    ));
                }
            }
        }
        Ok(Self {
            functions,
            fn_pcs: index.into_iter().collect(),
        })
    }

    /// The function owning this pc, if any
    pub fn function_for_pc(&self, pc: usize) -> Option<(&str, &FunctionMap)> {
        let at = self
            .fn_pcs
            .binary_search_by_key(&pc, |entry| entry.0)
            .ok()?;
        let name = self.fn_pcs[at].1.as_str();
        self.functions.get(name).map(|map| (name, map))
    }
}

/// Static coverage map of one contract: source file -> functions
#[derive(Debug, Clone, Default)]
pub struct ContractMap {
    pub sources: BTreeMap<String, SourceUnit>,
}

impl ContractMap {
    pub fn from_artifact(artifact: &BuildArtifact) -> CovResult<Self> {
        let mut sources = BTreeMap::new();
        for (source, raw_fns) in &artifact.coverage_map {
            let mut functions = BTreeMap::new();
            for (name, raw) in raw_fns {
                let owner = format!("{}:{}", artifact.contract_name, name);
                functions.insert(name.clone(), FunctionMap::from_raw(&owner, raw)?);
            }
            sources.insert(
                source.clone(),
                SourceUnit::new(&artifact.contract_name, functions)?,
            );
        }
        Ok(Self { sources })
    }
}

/// Skeletons of every contract loaded so far
#[derive(Debug, Clone, Default)]
pub struct CoverageMap {
    pub contracts: BTreeMap<String, ContractMap>,
}

impl CoverageMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, contract: impl Into<String>, map: ContractMap) {
        self.contracts.insert(contract.into(), map);
    }

    /// Look up a function's static map for merge-time weight recomputation
    pub fn function_map(&self, contract: &str, source: &str, name: &str) -> Option<&FunctionMap> {
        self.contracts
            .get(contract)?
            .sources
            .get(source)?
            .functions
            .get(name)
    }
}

/// Supply of per-contract coverage-map skeletons
pub trait MapSource {
    /// Load the skeleton for a contract name. `Ok(None)` means the contract
    /// is not tracked (missing artifact); that is not an error.
    fn load(&self, contract: &str) -> CovResult<Option<ContractMap>>;
}

/// Map source backed by a build-artifact directory
#[derive(Debug, Clone)]
pub struct ArtifactLoader {
    artifacts: ArtifactDir,
}

impl ArtifactLoader {
    pub fn new(artifacts: ArtifactDir) -> Self {
        Self { artifacts }
    }

    pub fn artifacts(&self) -> &ArtifactDir {
        &self.artifacts
    }
}

impl MapSource for ArtifactLoader {
    fn load(&self, contract: &str) -> CovResult<Option<ContractMap>> {
        match self.artifacts.load(contract)? {
            Some(artifact) => Ok(Some(ContractMap::from_artifact(&artifact)?)),
            None => Ok(None),
        }
    }
}

/// In-memory map source for embedders and tests
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    contracts: BTreeMap<String, ContractMap>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, contract: impl Into<String>, map: ContractMap) {
        self.contracts.insert(contract.into(), map);
    }
}

impl MapSource for MemorySource {
    fn load(&self, contract: &str) -> CovResult<Option<ContractMap>> {
        Ok(self.contracts.get(contract).cloned())
    }
}
