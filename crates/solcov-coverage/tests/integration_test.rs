// SPDX-License-Identifier: AGPL-3.0

use solcov_coverage::{
    merge_reports, ContractMap, CoverageMap, CoverageReport, FunctionMap, FunctionResult,
    LineSpec, MemorySource, Recorder, SourceUnit,
};
use solcov_traces::{Trace, TraceStep};
use std::collections::BTreeMap;

const PUSH1: u8 = 0x60;
const JUMPI: u8 = 0x57;

const CONTRACT: &str = "Token";
const SOURCE: &str = "contracts/Token.sol";
const FUNCTION: &str = "Token.transfer";

/// Two lines: line 0 plain (pcs 100-101), line 1 branching (pcs 110-111,
/// jump at 200). Total weight 3.
fn token_map() -> ContractMap {
    let fmap = FunctionMap::new(
        "Token:Token.transfer",
        [100, 101, 110, 111, 200].into_iter().collect(),
        vec![
            LineSpec::new([100, 101], None),
            LineSpec::new([110, 111], Some(200)),
        ],
        3,
    )
    .unwrap();
    let mut functions = BTreeMap::new();
    functions.insert(FUNCTION.to_string(), fmap);
    let unit = SourceUnit::new(CONTRACT, functions).unwrap();
    let mut map = ContractMap::default();
    map.sources.insert(SOURCE.to_string(), unit);
    map
}

fn source() -> MemorySource {
    let mut source = MemorySource::new();
    source.insert(CONTRACT, token_map());
    source
}

fn skeleton() -> CoverageMap {
    let mut skeleton = CoverageMap::new();
    skeleton.insert(CONTRACT, token_map());
    skeleton
}

fn step(pc: usize, op: u8) -> TraceStep {
    TraceStep {
        pc,
        op,
        contract: Some(CONTRACT.to_string()),
        source: Some(SOURCE.to_string()),
    }
}

fn trace(run: &str, steps: Vec<TraceStep>) -> Trace {
    Trace::new(run.to_string(), Some("0xdead".to_string()), steps)
}

fn function_result(report: &CoverageReport) -> &FunctionResult {
    &report.contracts[CONTRACT][SOURCE][FUNCTION]
}

#[test]
fn worked_example_two_lines_one_true_branch() {
    // One run hits line 0 and observes only the true outcome of line 1:
    // achieved 2 of 3 units.
    let mut recorder = Recorder::new(source());
    recorder
        .record_trace(&trace(
            "0x1",
            vec![
                step(100, PUSH1),
                step(110, PUSH1),
                step(200, JUMPI),
                step(300, PUSH1),
            ],
        ))
        .unwrap();

    let report = recorder.evaluate();
    let result = function_result(&report);
    assert_eq!(result.pct, 0.67);
    assert_eq!(result.line, [0].into_iter().collect());
    assert_eq!(result.true_branches, [1].into_iter().collect());
    assert!(result.false_branches.is_empty());
}

#[test]
fn zero_coverage_yields_bare_pct() {
    let recorder = {
        let mut r = Recorder::new(source());
        // the trace touches the contract but never a mapped line
        r.record_trace(&trace("0x1", vec![step(9999, PUSH1)])).unwrap();
        r
    };
    let report = recorder.evaluate();
    assert_eq!(*function_result(&report), FunctionResult::zero());
}

#[test]
fn full_coverage_collapses_to_pct_one() {
    let mut recorder = Recorder::new(source());
    // run 1 takes the jump, run 2 falls through
    recorder
        .record_trace(&trace(
            "0x1",
            vec![
                step(100, PUSH1),
                step(110, PUSH1),
                step(200, JUMPI),
                step(300, PUSH1),
            ],
        ))
        .unwrap();
    recorder
        .record_trace(&trace(
            "0x2",
            vec![step(110, PUSH1), step(200, JUMPI), step(201, PUSH1)],
        ))
        .unwrap();

    let report = recorder.evaluate();
    let result = function_result(&report);
    assert_eq!(*result, FunctionResult::full());

    let json = serde_json::to_value(result).unwrap();
    assert_eq!(json, serde_json::json!({"pct": 1.0}));
}

#[test]
fn trace_order_does_not_change_the_report() {
    let t1 = trace(
        "0x1",
        vec![step(100, PUSH1), step(110, PUSH1), step(200, JUMPI), step(300, PUSH1)],
    );
    let t2 = trace(
        "0x2",
        vec![step(110, PUSH1), step(200, JUMPI), step(201, PUSH1)],
    );
    let t3 = trace("0x3", vec![step(101, PUSH1)]);

    let mut forward = Recorder::new(source());
    forward.record_all([&t1, &t2, &t3]).unwrap();

    let mut backward = Recorder::new(source());
    backward.record_all([&t3, &t2, &t1]).unwrap();

    let a = serde_json::to_value(forward.evaluate()).unwrap();
    let b = serde_json::to_value(backward.evaluate()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn empty_trace_contributes_nothing() {
    let mut recorder = Recorder::new(source());
    // a pure value transfer executes no contract code
    recorder.record_trace(&trace("0x1", vec![])).unwrap();
    let report = recorder.evaluate();
    assert!(report.contracts.is_empty());
}

#[test]
fn merge_grows_monotonically() {
    let run_true = trace(
        "0x1",
        vec![step(100, PUSH1), step(110, PUSH1), step(200, JUMPI), step(300, PUSH1)],
    );
    let run_false = trace(
        "0x2",
        vec![step(110, PUSH1), step(200, JUMPI), step(201, PUSH1)],
    );

    let mut first = Recorder::new(source());
    first.record_trace(&run_true).unwrap();
    let r1 = first.evaluate();

    let mut second = Recorder::new(source());
    second.record_trace(&run_false).unwrap();
    let r2 = second.evaluate();

    let merged = merge_reports([&r1, &r2], &skeleton());
    let result = &merged[CONTRACT][SOURCE][FUNCTION];
    let p1 = function_result(&r1).pct;
    let p2 = function_result(&r2).pct;
    assert!(result.pct >= p1.max(p2));
    // opposite branch outcomes across the two files complete the branch, so
    // the union covers everything and collapses
    assert_eq!(*result, FunctionResult::full());
}

#[test]
fn merging_zero_report_is_identity() {
    let mut covered = Recorder::new(source());
    covered
        .record_trace(&trace(
            "0x1",
            vec![
                step(100, PUSH1),
                step(110, PUSH1),
                step(200, JUMPI),
                step(300, PUSH1),
            ],
        ))
        .unwrap();
    let partial = covered.evaluate();

    let untouched = Recorder::new(source()).evaluate();

    let merged = merge_reports([&untouched, &partial], &skeleton());
    assert_eq!(
        merged[CONTRACT][SOURCE][FUNCTION],
        *function_result(&partial)
    );
}

#[test]
fn report_roundtrips_through_json() {
    let mut recorder = Recorder::new(source());
    recorder
        .record_trace(&trace(
            "0x1",
            vec![step(100, PUSH1), step(110, PUSH1), step(200, JUMPI), step(300, PUSH1)],
        ))
        .unwrap();
    let mut report = recorder.evaluate();
    report.sha1.insert(
        "build/contracts/Token.json".to_string(),
        "a9993e364706816aba3e25717850c26c9cd0d89d".to_string(),
    );

    let json = serde_json::to_string_pretty(&report).unwrap();
    let back: CoverageReport = serde_json::from_str(&json).unwrap();
    assert_eq!(function_result(&back), function_result(&report));
    assert_eq!(back.sha1, report.sha1);
}
