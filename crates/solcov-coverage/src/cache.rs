// SPDX-License-Identifier: AGPL-3.0

//! Change detection
//!
//! Decides whether a test file's previously computed coverage can be reused.
//! The historical behavior trusted the mere presence of a prior report;
//! verifying the recorded content hashes is an explicit, separate policy so
//! the staleness trade-off is a visible configuration choice.

use crate::eval::CoverageReport;

/// When is a prior report good enough to skip recomputation?
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StalenessPolicy {
    /// Skip whenever a prior report exists, without checking hashes
    TrustExisting,
    /// Skip only when every path recorded in the prior report still hashes
    /// to the same digest
    VerifyHashes,
}

/// Decide whether recomputation can be skipped. `rehash` recomputes the
/// digest for a path recorded in the prior report (`None` when the path no
/// longer exists or cannot be hashed).
pub fn can_skip<F>(policy: StalenessPolicy, prior: Option<&CoverageReport>, rehash: F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    let Some(report) = prior else {
        return false;
    };
    match policy {
        StalenessPolicy::TrustExisting => true,
        StalenessPolicy::VerifyHashes => {
            // a report with no recorded hashes cannot be verified
            !report.sha1.is_empty()
                && report
                    .sha1
                    .iter()
                    .all(|(path, digest)| rehash(path).as_deref() == Some(digest.as_str()))
        }
    }
}
