// SPDX-License-Identifier: AGPL-3.0

//! Terminal summary of merged coverage

use colored::*;
use solcov_constants::{COVERAGE_LOW, COVERAGE_MEDIUM};
use solcov_coverage::ContractResults;

/// Display color for a coverage percentage
pub fn coverage_color(pct: f64) -> Color {
    if pct <= COVERAGE_LOW {
        Color::BrightRed
    } else if pct <= COVERAGE_MEDIUM {
        Color::BrightYellow
    } else {
        Color::BrightGreen
    }
}

/// Format a percentage with one decimal place
pub fn format_pct(pct: f64) -> String {
    format!("{:.1}%", pct * 100.0)
}

/// Print the per-contract, per-function coverage table
pub fn print_summary(merged: &ContractResults) {
    for (contract, sources) in merged {
        println!("  contract: {}", contract.bright_magenta());
        for functions in sources.values() {
            for (name, result) in functions {
                println!(
                    "    {} - {}",
                    name.cyan(),
                    format_pct(result.pct).color(coverage_color(result.pct))
                );
            }
        }
        println!();
    }
}
