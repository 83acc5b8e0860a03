// SPDX-License-Identifier: AGPL-3.0

//! solcov - smart-contract test coverage analyzer
//!
//! Correlates trace dumps left by the test runner against the compiler's
//! build artifacts, writes one coverage report per test file, and prints a
//! merged summary.

use anyhow::{Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use solcov_build::ArtifactDir;
use solcov_config::{clamp_range, parse_range, Config};
use solcov_constants::{CONTRACTS_BUILD_DIR, COVERAGE_BUILD_DIR, TRACES_BUILD_DIR};
use solcov_coverage::{
    can_skip, merge_reports, ArtifactLoader, CoverageMap, CoverageReport, MapSource, Recorder,
    StalenessPolicy,
};
use solcov_hashes::{bytecode_hash, sha1_hex};
use solcov_logs::ErrorCode;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod summary;

use summary::print_summary;

fn main() {
    if let Err(err) = run() {
        eprintln!("{}", format!("ERROR: {:#}", err).red());
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let config = Config::load()?;
    init_tracing(config.verbose);
    print_banner();

    let contracts_dir = config.root.join(CONTRACTS_BUILD_DIR);
    let traces_dir = config.root.join(TRACES_BUILD_DIR);
    let coverage_dir = config.root.join(COVERAGE_BUILD_DIR);

    let trace_files = discover_trace_files(&traces_dir, &config)?;
    if trace_files.is_empty() {
        anyhow::bail!("No test trace files found in {}", traces_dir.display());
    }
    tracing::debug!(count = trace_files.len(), "discovered trace files");

    let range = match &config.range {
        Some(arg) => {
            if trace_files.len() > 1 {
                anyhow::bail!("Cannot specify a range when running multiple test files");
            }
            Some(parse_range(arg)?)
        }
        None => None,
    };

    let artifacts = ArtifactDir::new(&contracts_dir);
    let policy = if config.check_hashes {
        StalenessPolicy::VerifyHashes
    } else {
        StalenessPolicy::TrustExisting
    };

    let progress = ProgressBar::new(trace_files.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let mut reports: Vec<CoverageReport> = Vec::new();
    let mut skeleton = CoverageMap::new();

    for trace_file in &trace_files {
        let stem = trace_file
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("coverage");
        progress.set_message(stem.to_string());

        let coverage_json = coverage_dir.join(format!("{}.json", stem));

        if config.update {
            let prior = read_report(&coverage_json);
            let skip = can_skip(policy, prior.as_ref(), |path| {
                rehash_path(path, &contracts_dir)
            });
            if skip {
                if let Some(report) = prior {
                    reports.push(report);
                }
                progress.inc(1);
                continue;
            }
            if prior.is_some() && policy == StalenessPolicy::VerifyHashes {
                solcov_logs::warn_code(
                    ErrorCode::StaleCoverage,
                    &format!("Coverage for {} is stale, re-evaluating", stem),
                    true,
                );
            }
        }

        let report = evaluate_trace_file(trace_file, &artifacts, range.as_ref(), &mut skeleton)?;

        // partial runs are merged but never persisted over a full report
        if range.is_none() {
            std::fs::create_dir_all(&coverage_dir)
                .with_context(|| format!("Failed to create {}", coverage_dir.display()))?;
            let json = serde_json::to_string_pretty(&report)?;
            std::fs::write(&coverage_json, json)
                .with_context(|| format!("Failed to write {}", coverage_json.display()))?;
        }
        reports.push(report);
        progress.inc(1);
    }
    progress.finish_and_clear();

    println!("\n{}\n", "Coverage analysis complete!".bright_green());

    // contracts only seen in cached reports still need weights for merging
    let loader = ArtifactLoader::new(artifacts);
    for report in &reports {
        for contract in report.contracts.keys() {
            if !skeleton.contracts.contains_key(contract) {
                if let Some(map) = loader.load(contract)? {
                    skeleton.insert(contract.clone(), map);
                }
            }
        }
    }

    let merged = merge_reports(reports.iter(), &skeleton);
    print_summary(&merged);

    println!(
        "Detailed reports saved in {}",
        coverage_dir.display().to_string().bright_cyan()
    );
    Ok(())
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_banner() {
    println!(
        "{} {}",
        "solcov".bright_cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
}

/// List trace dumps under build/traces, filtered by the positional filename
/// and the --match regex
fn discover_trace_files(traces_dir: &Path, config: &Config) -> Result<Vec<PathBuf>> {
    let matcher = if config.match_test.is_empty() {
        None
    } else {
        Some(
            Regex::new(&config.match_test)
                .with_context(|| format!("Invalid --match regex: {}", config.match_test))?,
        )
    };

    let mut files = Vec::new();
    if !traces_dir.exists() {
        return Ok(files);
    }
    for entry in std::fs::read_dir(traces_dir)
        .with_context(|| format!("Failed to read {}", traces_dir.display()))?
    {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let stem = match path.file_stem().and_then(|s| s.to_str()) {
            Some(stem) => stem,
            None => continue,
        };
        if let Some(wanted) = &config.filename {
            let wanted_stem = Path::new(wanted)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or(wanted.as_str());
            if stem != wanted_stem {
                continue;
            }
        }
        if let Some(matcher) = &matcher {
            if !matcher.is_match(stem) {
                continue;
            }
        }
        files.push(path);
    }
    files.sort();
    Ok(files)
}

/// Read a prior report, tolerating missing or malformed files
fn read_report(path: &Path) -> Option<CoverageReport> {
    let content = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&content).ok()
}

/// Record, evaluate, and hash one test file's traces
fn evaluate_trace_file(
    trace_file: &Path,
    artifacts: &ArtifactDir,
    range: Option<&std::ops::Range<usize>>,
    skeleton: &mut CoverageMap,
) -> Result<CoverageReport> {
    let traces = solcov_traces::load_trace_file(trace_file)
        .with_context(|| format!("Failed to load {}", trace_file.display()))?;
    if traces.is_empty() {
        solcov_logs::warn_code(
            ErrorCode::EmptyTrace,
            &format!("{} contains no traces", trace_file.display()),
            false,
        );
    }

    let selected = match range {
        Some(range) => &traces[clamp_range(range, traces.len())],
        None => &traces[..],
    };

    let mut recorder = Recorder::new(ArtifactLoader::new(artifacts.clone()));
    recorder.record_all(selected)?;

    let mut report = recorder.evaluate();

    // hash every implicated artifact (metadata stripped) and the trace dump
    // itself, for downstream change detection
    for contract in report.contracts.keys().cloned().collect::<Vec<_>>() {
        let path = artifacts.artifact_path(&contract);
        if let Some(artifact) = artifacts.load(&contract)? {
            report.sha1.insert(
                path.display().to_string(),
                bytecode_hash(&artifact.bytecode),
            );
        }
    }
    let trace_bytes = std::fs::read(trace_file)?;
    report.sha1.insert(
        trace_file.display().to_string(),
        sha1_hex(&trace_bytes),
    );

    let map = recorder.into_map();
    for (contract, cmap) in map.contracts {
        skeleton.contracts.entry(contract).or_insert(cmap);
    }

    Ok(report)
}

/// Recompute the digest for a path recorded in a prior report: artifacts are
/// hashed on their metadata-stripped bytecode, anything else on raw bytes
fn rehash_path(path: &str, contracts_dir: &Path) -> Option<String> {
    let path_ref = Path::new(path);
    if path_ref.starts_with(contracts_dir) {
        let artifact = solcov_build::load_artifact(path_ref).ok()?;
        return Some(bytecode_hash(&artifact.bytecode));
    }
    let bytes = std::fs::read(path_ref).ok()?;
    Some(sha1_hex(&bytes))
}
