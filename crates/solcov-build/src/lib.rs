// SPDX-License-Identifier: AGPL-3.0

//! Build artifact parsing and contract loading
//!
//! The compiler emits one JSON artifact per contract under
//! `build/contracts/<Name>.json`, carrying the deployable bytecode and the
//! static coverage map (which program counters belong to which source lines,
//! functions, and conditional branches).

use serde::{Deserialize, Serialize};
use solcov_exceptions::{CovError, CovResult};
use solcov_logs::ErrorCode;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Program counters of a function's body
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RawFnInfo {
    #[serde(default)]
    pub pc: Vec<usize>,
}

/// One source line's program counters and, for branching lines, the program
/// counter of the conditional jump
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawLineMap {
    #[serde(default)]
    pub pc: Vec<usize>,
    #[serde(default)]
    pub jump: Option<usize>,
}

/// Coverage map entry for one function
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFunctionMap {
    #[serde(rename = "fn", default)]
    pub fn_info: RawFnInfo,
    #[serde(default)]
    pub line: Vec<RawLineMap>,
    /// Normalization denominator: sum of per-line weights
    pub total: usize,
}

/// Coverage map: source file path -> function name -> map entry
pub type RawCoverageMap = BTreeMap<String, BTreeMap<String, RawFunctionMap>>;

/// Build artifact emitted by the compiler for one contract
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildArtifact {
    #[serde(rename = "contractName")]
    pub contract_name: String,
    pub bytecode: String,
    #[serde(rename = "coverageMap", default)]
    pub coverage_map: RawCoverageMap,
}

/// Parse a single artifact file
pub fn load_artifact(path: &Path) -> CovResult<BuildArtifact> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| CovError::parsing(path.display().to_string(), e.to_string()))
}

/// Directory of per-contract build artifacts
#[derive(Debug, Clone)]
pub struct ArtifactDir {
    root: PathBuf,
}

impl ArtifactDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of the artifact for a contract name
    pub fn artifact_path(&self, contract: &str) -> PathBuf {
        self.root.join(format!("{}.json", contract))
    }

    /// Load a contract's artifact. Missing or malformed artifacts resolve to
    /// `None` with a warning; a trace can legitimately reference contracts
    /// the build knows nothing about.
    pub fn load(&self, contract: &str) -> CovResult<Option<BuildArtifact>> {
        let path = self.artifact_path(contract);
        if !path.exists() {
            solcov_logs::warn_code(
                ErrorCode::MissingArtifact,
                &format!("No build artifact for contract {}", contract),
                false,
            );
            return Ok(None);
        }
        match load_artifact(&path) {
            Ok(artifact) => Ok(Some(artifact)),
            Err(e) => {
                solcov_logs::warn_code(
                    ErrorCode::ParsingError,
                    &format!("Skipped artifact for {}: {}", contract, e),
                    false,
                );
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const TOKEN_ARTIFACT: &str = r#"{
        "contractName": "Token",
        "bytecode": "0x60806040",
        "coverageMap": {
            "contracts/Token.sol": {
                "Token.transfer": {
                    "fn": {"pc": [100, 101, 110, 111]},
                    "line": [
                        {"pc": [100, 101], "jump": null},
                        {"pc": [110, 111], "jump": 200}
                    ],
                    "total": 3
                }
            }
        }
    }"#;

    #[test]
    fn test_parse_artifact() {
        let artifact: BuildArtifact = serde_json::from_str(TOKEN_ARTIFACT).unwrap();
        assert_eq!(artifact.contract_name, "Token");
        assert_eq!(artifact.bytecode, "0x60806040");

        let unit = &artifact.coverage_map["contracts/Token.sol"];
        let fn_map = &unit["Token.transfer"];
        assert_eq!(fn_map.fn_info.pc.len(), 4);
        assert_eq!(fn_map.line.len(), 2);
        assert_eq!(fn_map.line[0].jump, None);
        assert_eq!(fn_map.line[1].jump, Some(200));
        assert_eq!(fn_map.total, 3);
    }

    #[test]
    fn test_parse_artifact_without_coverage_map() {
        let artifact: BuildArtifact =
            serde_json::from_str(r#"{"contractName": "Lib", "bytecode": "0x00"}"#).unwrap();
        assert!(artifact.coverage_map.is_empty());
    }

    #[test]
    fn test_artifact_dir_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("Token.json")).unwrap();
        file.write_all(TOKEN_ARTIFACT.as_bytes()).unwrap();

        let artifacts = ArtifactDir::new(dir.path());
        let loaded = artifacts.load("Token").unwrap();
        assert_eq!(loaded.unwrap().contract_name, "Token");
    }

    #[test]
    fn test_artifact_dir_missing() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = ArtifactDir::new(dir.path());
        assert!(artifacts.load("Nope").unwrap().is_none());
    }

    #[test]
    fn test_artifact_dir_malformed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Broken.json"), "{not json").unwrap();

        let artifacts = ArtifactDir::new(dir.path());
        assert!(artifacts.load("Broken").unwrap().is_none());
    }

    #[test]
    fn test_artifact_path() {
        let artifacts = ArtifactDir::new("build/contracts");
        assert_eq!(
            artifacts.artifact_path("Token"),
            PathBuf::from("build/contracts/Token.json")
        );
    }
}
