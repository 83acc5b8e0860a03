// SPDX-License-Identifier: AGPL-3.0

//! Configuration for the coverage analyzer
//!
//! Options come from the command line, optionally overlaid on a
//! `solcov.toml` file in the project root. Values set on the command line
//! win over file values.

use clap::Parser;
use serde::Deserialize;
use solcov_exceptions::{CovError, CovResult};
use std::ops::Range;
use std::path::PathBuf;

/// Analyze smart-contract test coverage from recorded execution traces
#[derive(Debug, Clone, Parser)]
#[clap(name = "solcov", version, about)]
pub struct Config {
    /// Only evaluate coverage for a specific test trace file
    pub filename: Option<String>,

    /// Number or range of runs to replay from a single file (eg. 3 or 1:4)
    pub range: Option<String>,

    /// Only evaluate coverage when no prior report exists
    #[clap(long)]
    pub update: bool,

    /// With --update, verify the recorded content hashes before skipping
    #[clap(long)]
    pub check_hashes: bool,

    /// Only evaluate trace files whose name matches the given regex
    #[clap(long, short = 'm', default_value = "")]
    pub match_test: String,

    /// Project root directory
    #[clap(long, default_value = ".")]
    pub root: PathBuf,

    /// Path to the config file (defaults to <root>/solcov.toml)
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose diagnostics
    #[clap(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Subset of options readable from solcov.toml
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub update: Option<bool>,
    #[serde(default)]
    pub check_hashes: Option<bool>,
    #[serde(default)]
    pub match_test: Option<String>,
}

impl Config {
    /// Parse the command line and overlay the config file, if present
    pub fn load() -> CovResult<Self> {
        let mut config = Self::parse();
        let path = config
            .config
            .clone()
            .unwrap_or_else(|| config.root.join("solcov.toml"));
        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let file: FileConfig = toml::from_str(&content)
                .map_err(|e| CovError::parsing(path.display().to_string(), e.to_string()))?;
            config.apply_file(file);
        }
        Ok(config)
    }

    /// Overlay file values where the command line left defaults
    pub fn apply_file(&mut self, file: FileConfig) {
        if let Some(update) = file.update {
            self.update = self.update || update;
        }
        if let Some(check_hashes) = file.check_hashes {
            self.check_hashes = self.check_hashes || check_hashes;
        }
        if self.match_test.is_empty() {
            if let Some(match_test) = file.match_test {
                self.match_test = match_test;
            }
        }
    }
}

/// Parse a 1-based run selection: "3" picks the third run, "1:4" picks runs
/// one through three (half-open after conversion, as a slice)
pub fn parse_range(arg: &str) -> CovResult<Range<usize>> {
    let invalid = || CovError::InvalidRange(arg.to_string());

    let parse_index = |s: &str| -> CovResult<usize> {
        let n: usize = s.trim().parse().map_err(|_| invalid())?;
        if n == 0 {
            return Err(invalid());
        }
        Ok(n - 1)
    };

    match arg.split_once(':') {
        Some((start, end)) => Ok(parse_index(start)?..parse_index(end)?),
        None => {
            let start = parse_index(arg)?;
            Ok(start..start + 1)
        }
    }
}

/// Clamp a parsed range to a collection length
pub fn clamp_range(range: &Range<usize>, len: usize) -> Range<usize> {
    let end = range.end.min(len);
    range.start.min(end)..end
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_index() {
        assert_eq!(parse_range("3").unwrap(), 2..3);
        assert_eq!(parse_range("1").unwrap(), 0..1);
    }

    #[test]
    fn test_parse_slice() {
        assert_eq!(parse_range("1:4").unwrap(), 0..3);
        assert_eq!(parse_range("2:5").unwrap(), 1..4);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_range("x").is_err());
        assert!(parse_range("1:y").is_err());
        assert!(parse_range("").is_err());
    }

    #[test]
    fn test_parse_rejects_zero() {
        // indices are 1-based
        assert!(parse_range("0").is_err());
        assert!(parse_range("0:3").is_err());
    }

    #[test]
    fn test_clamp_range() {
        assert_eq!(clamp_range(&(0..3), 2), 0..2);
        assert_eq!(clamp_range(&(5..9), 2), 2..2);
        assert_eq!(clamp_range(&(0..1), 4), 0..1);
    }

    #[test]
    fn test_cli_defaults() {
        let config = Config::parse_from(["solcov"]);
        assert!(!config.update);
        assert!(!config.check_hashes);
        assert_eq!(config.root, PathBuf::from("."));
        assert!(config.filename.is_none());
        assert_eq!(config.verbose, 0);
    }

    #[test]
    fn test_cli_flags() {
        let config = Config::parse_from([
            "solcov",
            "tests/token",
            "1:4",
            "--update",
            "--check-hashes",
            "-m",
            "token.*",
            "-vv",
        ]);
        assert_eq!(config.filename.as_deref(), Some("tests/token"));
        assert_eq!(config.range.as_deref(), Some("1:4"));
        assert!(config.update);
        assert!(config.check_hashes);
        assert_eq!(config.match_test, "token.*");
        assert_eq!(config.verbose, 2);
    }

    #[test]
    fn test_file_overlay_cli_wins() {
        let mut config = Config::parse_from(["solcov", "-m", "cli"]);
        config.apply_file(FileConfig {
            update: Some(true),
            check_hashes: None,
            match_test: Some("file".to_string()),
        });
        assert!(config.update);
        assert_eq!(config.match_test, "cli");
    }

    #[test]
    fn test_file_overlay_fills_defaults() {
        let mut config = Config::parse_from(["solcov"]);
        config.apply_file(FileConfig {
            update: None,
            check_hashes: Some(true),
            match_test: Some("token".to_string()),
        });
        assert!(!config.update);
        assert!(config.check_hashes);
        assert_eq!(config.match_test, "token");
    }

    #[test]
    fn test_toml_parsing() {
        let file: FileConfig =
            toml::from_str("update = true\nmatch_test = \"token.*\"\n").unwrap();
        assert_eq!(file.update, Some(true));
        assert_eq!(file.match_test.as_deref(), Some("token.*"));
        assert!(file.check_hashes.is_none());
    }
}
