// SPDX-License-Identifier: AGPL-3.0

//! Content hashing for change detection
//!
//! Compiled bytecode is hashed with its trailing metadata suffix stripped,
//! so two builds that differ only in metadata hash identically.

use sha1::{Digest, Sha1};
use solcov_constants::METADATA_HEX_LEN;

/// Compute the SHA-1 hex digest of arbitrary bytes
pub fn sha1_hex(data: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Strip the trailing compiler metadata suffix from a bytecode hex string.
/// Inputs shorter than the suffix are returned unchanged.
pub fn strip_metadata(hexcode: &str) -> &str {
    if hexcode.len() > METADATA_HEX_LEN {
        &hexcode[..hexcode.len() - METADATA_HEX_LEN]
    } else {
        hexcode
    }
}

/// Hash a bytecode hex string for change detection (metadata excluded)
pub fn bytecode_hash(hexcode: &str) -> String {
    sha1_hex(strip_metadata(hexcode).as_bytes())
}
