// Copyright 2026 The MuTate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Capability Block Proc Macro Tests
//!
//! Using trybuild.

#[test]
fn test_procmacro_capability_blocks_expands() {
    let t = trybuild::TestCases::new();
    t.pass("tests/blocks/pass-registry.rs");
}
