// SPDX-License-Identifier: AGPL-3.0

/// Control-flow opcodes
pub const OP_STOP: u8 = 0x00;
pub const OP_JUMP: u8 = 0x56;
pub const OP_JUMPI: u8 = 0x57;
pub const OP_JUMPDEST: u8 = 0x5B;

/// Call/terminator opcodes seen at trace boundaries
pub const OP_RETURN: u8 = 0xF3;
pub const OP_REVERT: u8 = 0xFD;
pub const OP_INVALID: u8 = 0xFE;
pub const OP_SELFDESTRUCT: u8 = 0xFF;

/// Length, in hex characters, of the metadata suffix the compiler appends to
/// bytecode. The suffix varies between otherwise identical builds and must be
/// stripped before hashing.
pub const METADATA_HEX_LEN: usize = 68;

/// Weight of a branching source line (true and false outcomes count separately)
pub const BRANCH_WEIGHT: usize = 2;

/// Weight of a straight-line source line
pub const LINE_WEIGHT: usize = 1;

/// Display bands for coverage percentages: at or below the first bound is
/// low, at or below the second is medium, everything else is high.
pub const COVERAGE_LOW: f64 = 0.5;
pub const COVERAGE_MEDIUM: f64 = 0.85;

/// Default project directory layout
pub const CONTRACTS_BUILD_DIR: &str = "build/contracts";
pub const TRACES_BUILD_DIR: &str = "build/traces";
pub const COVERAGE_BUILD_DIR: &str = "build/coverage";
