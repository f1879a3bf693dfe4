// Copyright 2026 The MuTate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One walk over three chains of the same shape: required, optional, and live.  No per-block code.

use ash::vk;
use log::debug;

use super::Disqualification;
use crate::{chain::CapabilityChain, requirements::RequirementSet, runtime::Runtime};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlagOutcome {
    Enable,
    Disable,
    /// Required but the device doesn't have it.
    Missing,
}

/// | required | optional | live | outcome |
/// |---|---|---|---|
/// | T | _ | T | enable |
/// | T | _ | F | missing |
/// | F | T | T | enable |
/// | F | T | F | disable |
/// | F | F | _ | disable |
pub fn resolve_flag(required: bool, optional: bool, live: bool) -> FlagOutcome {
    match (required, optional, live) {
        (true, _, true) => FlagOutcome::Enable,
        (true, _, false) => FlagOutcome::Missing,
        (false, true, true) => FlagOutcome::Enable,
        (false, _, _) => FlagOutcome::Disable,
    }
}

/// Resolve against already queried live values.  `live` must have the shape of the requirements.
pub fn resolve(
    required: &CapabilityChain,
    optional: &CapabilityChain,
    live: &CapabilityChain,
) -> Result<CapabilityChain, Disqualification> {
    assert!(
        required.ids().eq(optional.ids()),
        "required and optional feature chains must have the same shape"
    );
    assert!(
        required.ids().eq(live.ids()),
        "live feature chain must mirror the required chain"
    );

    let mut enabled = CapabilityChain::new();
    let mut missing = Vec::new();

    let lockstep = required.blocks().zip(optional.blocks()).zip(live.blocks());
    for ((r, o), h) in lockstep {
        let schema = r.schema();
        for (i, field) in schema.flags() {
            let on = |b: &crate::registry::Block| b.flag(i) == Some(true);
            match resolve_flag(on(r), on(o), on(h)) {
                // Blocks only materialize on first enable.
                FlagOutcome::Enable => enabled.set_flag(schema.id, i, true),
                FlagOutcome::Missing => missing.push((schema.name, field.name)),
                FlagOutcome::Disable => {
                    if on(o) {
                        debug!("optional feature {}.{} not available", schema.name, field.name);
                    }
                }
            }
        }
    }

    for (block, field) in &missing {
        debug!("missing required feature {block}.{field}");
    }
    match missing.first() {
        Some(&(block, field)) => Err(Disqualification::MissingFeature { block, field }),
        None => Ok(enabled),
    }
}

pub(super) fn check<R: Runtime + ?Sized>(
    runtime: &R,
    adapter: vk::PhysicalDevice,
    reqs: &RequirementSet,
) -> Result<CapabilityChain, Disqualification> {
    let mut live = CapabilityChain::new();
    live.mirror_shape(reqs.required());
    runtime.features(adapter, &mut live);
    resolve(reqs.required(), reqs.optional(), &live)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::registry::{schema_for, HEAD_BLOCK};

    const V12: vk::StructureType = vk::StructureType::PHYSICAL_DEVICE_VULKAN_1_2_FEATURES;
    const V13: vk::StructureType = vk::StructureType::PHYSICAL_DEVICE_VULKAN_1_3_FEATURES;

    #[test]
    fn test_truth_table() {
        for r in [false, true] {
            for o in [false, true] {
                for h in [false, true] {
                    let expected = match (r, o, h) {
                        (true, _, true) | (false, true, true) => FlagOutcome::Enable,
                        (true, _, false) => FlagOutcome::Missing,
                        _ => FlagOutcome::Disable,
                    };
                    assert_eq!(resolve_flag(r, o, h), expected, "({r}, {o}, {h})");
                }
            }
        }
    }

    #[test]
    fn test_truth_table_through_chains() {
        let a = schema_for(V12).field_index("timeline_semaphore").unwrap();
        let b = schema_for(V12).field_index("buffer_device_address").unwrap();
        let c = schema_for(V12).field_index("shader_int8").unwrap();
        let d = schema_for(V12).field_index("shader_float16").unwrap();

        let mut required = CapabilityChain::new();
        let mut optional = CapabilityChain::new();
        required.ensure_block(V12);
        optional.ensure_block(V12);
        required.ensure_block(V13);
        optional.ensure_block(V13);
        required.set_flags(V12, &[a]);
        optional.set_flags(V12, &[b, c]);

        let mut live = CapabilityChain::new();
        live.mirror_shape(&required);
        live.set_flags(V12, &[a, b, d]);

        let enabled = resolve(&required, &optional, &live).unwrap();
        assert_eq!(enabled.flag(V12, a), Some(true));
        assert_eq!(enabled.flag(V12, b), Some(true));
        assert_eq!(enabled.flag(V12, c), Some(false));
        assert_eq!(enabled.flag(V12, d), Some(false));
        // Untouched blocks are never allocated.
        assert!(!enabled.contains(V13));
        assert_eq!(enabled.len(), 1);
    }

    #[test]
    fn test_missing_required_names_block_and_field() {
        let wide = schema_for(HEAD_BLOCK).field_index("wide_lines").unwrap();
        let mut required = CapabilityChain::new();
        required.set_flags(HEAD_BLOCK, &[wide]);
        let optional = CapabilityChain::new();
        let live = CapabilityChain::new();

        assert_eq!(
            resolve(&required, &optional, &live).unwrap_err(),
            Disqualification::MissingFeature {
                block: "VkPhysicalDeviceFeatures",
                field: "wide_lines"
            }
        );
    }

    #[test]
    #[should_panic(expected = "same shape")]
    fn test_shape_mismatch_panics() {
        let mut required = CapabilityChain::new();
        required.ensure_block(V12);
        let optional = CapabilityChain::new();
        let mut live = CapabilityChain::new();
        live.mirror_shape(&required);
        let _ = resolve(&required, &optional, &live);
    }
}
