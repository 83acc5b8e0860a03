// SPDX-License-Identifier: AGPL-3.0

//! Colored diagnostics with once-only deduplication

use colored::*;
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::sync::Mutex;

/// Warnings base URL
pub const WARNINGS_BASE_URL: &str = "https://github.com/solcov/solcov/wiki/warnings";

/// Error codes for warnings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ParsingError,
    InternalError,
    MissingArtifact,
    StaleCoverage,
    EmptyTrace,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCode::ParsingError => "parsing-error",
            ErrorCode::InternalError => "internal-error",
            ErrorCode::MissingArtifact => "missing-artifact",
            ErrorCode::StaleCoverage => "stale-coverage",
            ErrorCode::EmptyTrace => "empty-trace",
        }
    }

    pub fn url(&self) -> String {
        format!("{}#{}", WARNINGS_BASE_URL, self.code())
    }
}

/// Logger state for tracking unique messages
static UNIQUE_MESSAGES: Lazy<Mutex<HashSet<String>>> = Lazy::new(|| Mutex::new(HashSet::new()));

/// Check if a message has been logged (for unique logging)
fn is_logged(message: &str) -> bool {
    let messages = UNIQUE_MESSAGES.lock().unwrap();
    messages.contains(message)
}

/// Mark a message as logged
fn mark_logged(message: &str) {
    let mut messages = UNIQUE_MESSAGES.lock().unwrap();
    messages.insert(message.to_string());
}

/// Log a debug message
pub fn debug(text: &str, allow_duplicate: bool) {
    if allow_duplicate || !is_logged(text) {
        eprintln!("{}", text.dimmed());
        if !allow_duplicate {
            mark_logged(text);
        }
    }
}

/// Log an info message
pub fn info(text: &str, allow_duplicate: bool) {
    if allow_duplicate || !is_logged(text) {
        println!("{}", text);
        if !allow_duplicate {
            mark_logged(text);
        }
    }
}

/// Log a warning message
pub fn warn(text: &str, allow_duplicate: bool) {
    if allow_duplicate || !is_logged(text) {
        eprintln!("{}", text.yellow());
        if !allow_duplicate {
            mark_logged(text);
        }
    }
}

/// Log an error message
pub fn error(text: &str, allow_duplicate: bool) {
    if allow_duplicate || !is_logged(text) {
        eprintln!("{}", text.red());
        if !allow_duplicate {
            mark_logged(text);
        }
    }
}

/// Log a warning with an error code
pub fn warn_code(error_code: ErrorCode, msg: &str, allow_duplicate: bool) {
    let full_msg = format!("{}\n(see {})", msg, error_code.url());
    warn(&full_msg, allow_duplicate);
}

/// Log a unique warning (alias for warn with allow_duplicate=false)
pub fn warn_unique(text: &str) {
    warn(text, false);
}

/// Clear all logged messages (useful for testing)
pub fn clear_logged_messages() {
    let mut messages = UNIQUE_MESSAGES.lock().unwrap();
    messages.clear();
}
