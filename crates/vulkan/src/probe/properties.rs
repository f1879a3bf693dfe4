// Copyright 2026 The MuTate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Normalized properties.  Callers size their resources from these, not from raw driver limits.

use ash::vk;

use super::Disqualification;
use crate::{runtime::AdapterProperties, util::ApiVersion};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeviceProperties {
    pub name: String,
    pub vendor_id: u32,
    pub device_id: u32,
    pub driver_version: u32,
    /// The lesser of what the device offers and what was asked for.  Nothing above the requested
    /// version may be used.
    pub api_version: u32,
    pub subgroup_size: u32,
    pub limits: Limits,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Limits {
    pub line_width: [f32; 2],
    pub point_size: [f32; 2],
    pub global: GlobalLimits,
    pub per_descriptor: DescriptorLimits,
    pub per_stage: BindingLimits,
    pub per_pipeline: PipelineLimits,
    pub compute: ComputeLimits,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GlobalLimits {
    pub max_allocation_size: vk::DeviceSize,
    pub max_memory_allocation_count: u32,
    pub max_sampler_allocation_count: u32,
}

/// Image dimensions are signed downstream, so they are clamped to `i32::MAX`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DescriptorLimits {
    pub max_image_dimension_1d: i32,
    pub max_image_dimension_2d: i32,
    pub max_image_dimension_3d: i32,
    pub max_image_dimension_cube: i32,
    pub max_image_array_layers: i32,
    pub max_sampler_anisotropy: f32,
    pub max_uniform_buffer_range: u32,
    pub max_storage_buffer_range: u32,
}

/// Descriptor counts.  Used per stage and per pipeline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BindingLimits {
    pub max_samplers: u32,
    pub max_sampled_images: u32,
    /// A combined image sampler spends one of each.
    pub max_combined_image_samplers: u32,
    pub max_storage_images: u32,
    pub max_uniform_buffers: u32,
    pub max_storage_buffers: u32,
    pub max_resources: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineLimits {
    pub bindings: BindingLimits,
    pub max_bound_descriptor_sets: u32,
    pub max_push_constants_size: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ComputeLimits {
    pub max_dispatch_size: vk::Extent3D,
    pub max_local_size: vk::Extent3D,
    pub max_workgroup_invocations: u32,
    pub max_workgroup_subgroups: u32,
    pub min_subgroup_size: u32,
    pub max_subgroup_size: u32,
}

fn clamp_i32(v: u32) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

fn extent(v: [u32; 3]) -> vk::Extent3D {
    vk::Extent3D {
        width: v[0],
        height: v[1],
        depth: v[2],
    }
}

pub(super) fn check(
    props: &AdapterProperties,
    min_api_version: u32,
) -> Result<DeviceProperties, Disqualification> {
    if props.api_version < min_api_version {
        return Err(Disqualification::ApiVersion {
            found: ApiVersion(props.api_version),
            required: ApiVersion(min_api_version),
        });
    }

    let l = &props.limits;
    let limits = Limits {
        line_width: l.line_width_range,
        point_size: l.point_size_range,
        global: GlobalLimits {
            max_allocation_size: props.max_memory_allocation_size,
            max_memory_allocation_count: l.max_memory_allocation_count,
            max_sampler_allocation_count: l.max_sampler_allocation_count,
        },
        per_descriptor: DescriptorLimits {
            max_image_dimension_1d: clamp_i32(l.max_image_dimension1_d),
            max_image_dimension_2d: clamp_i32(l.max_image_dimension2_d),
            max_image_dimension_3d: clamp_i32(l.max_image_dimension3_d),
            max_image_dimension_cube: clamp_i32(l.max_image_dimension_cube),
            max_image_array_layers: clamp_i32(l.max_image_array_layers),
            max_sampler_anisotropy: l.max_sampler_anisotropy,
            max_uniform_buffer_range: l.max_uniform_buffer_range,
            max_storage_buffer_range: l.max_storage_buffer_range,
        },
        per_stage: BindingLimits {
            max_samplers: l.max_per_stage_descriptor_samplers,
            max_sampled_images: l.max_per_stage_descriptor_sampled_images,
            max_combined_image_samplers: l
                .max_per_stage_descriptor_samplers
                .min(l.max_per_stage_descriptor_sampled_images),
            max_storage_images: l.max_per_stage_descriptor_storage_images,
            max_uniform_buffers: l.max_per_stage_descriptor_uniform_buffers,
            max_storage_buffers: l.max_per_stage_descriptor_storage_buffers,
            max_resources: l.max_per_stage_resources,
        },
        per_pipeline: PipelineLimits {
            bindings: BindingLimits {
                max_samplers: l.max_descriptor_set_samplers,
                max_sampled_images: l.max_descriptor_set_sampled_images,
                max_combined_image_samplers: l
                    .max_descriptor_set_samplers
                    .min(l.max_descriptor_set_sampled_images),
                max_storage_images: l.max_descriptor_set_storage_images,
                max_uniform_buffers: l.max_descriptor_set_uniform_buffers,
                max_storage_buffers: l.max_descriptor_set_storage_buffers,
                // NOTE there is no per-set resource limit.  Per stage is the tighter bound anyway.
                max_resources: l.max_per_stage_resources,
            },
            max_bound_descriptor_sets: l.max_bound_descriptor_sets,
            max_push_constants_size: l.max_push_constants_size,
        },
        compute: ComputeLimits {
            max_dispatch_size: extent(l.max_compute_work_group_count),
            max_local_size: extent(l.max_compute_work_group_size),
            max_workgroup_invocations: l.max_compute_work_group_invocations,
            max_workgroup_subgroups: props.max_compute_workgroup_subgroups,
            min_subgroup_size: props.min_subgroup_size,
            max_subgroup_size: props.max_subgroup_size,
        },
    };

    Ok(DeviceProperties {
        name: props.name.clone(),
        vendor_id: props.vendor_id,
        device_id: props.device_id,
        driver_version: props.driver_version,
        api_version: props.api_version.min(min_api_version),
        subgroup_size: props.subgroup_size,
        limits,
    })
}
