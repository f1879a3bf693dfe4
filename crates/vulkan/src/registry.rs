// Copyright 2026 The MuTate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Capability Registry
//!
//! Every `VkPhysicalDevice*Features` structure we know about, described as data.  A schema says
//! what a block is called, how big it is, and which of its fields are boolean toggles.  It owns
//! nothing.  Instances live in [`Block`], one variant per structure, so all reads and writes go
//! through generated accessors instead of pointer arithmetic.
//!
//! The table must keep up with the Vulkan catalogue.  Asking for a schema that is not here is a
//! programming error and panics.  Adding a block is one entry below.
//!
//! Flag indexes are schema indexes.  Chained blocks spend 0 and 1 on `s_type` and `p_next`, the head
//! block (`VkPhysicalDeviceFeatures`, identified by `PHYSICAL_DEVICE_FEATURES_2`) starts at 0.

use std::ffi::CStr;

use ash::vk;
use mutate_macros::capability_blocks;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    StructureType,
    Pointer,
    Bool,
}

#[derive(Debug)]
pub struct FieldDescriptor {
    pub kind: FieldKind,
    /// Byte offset inside the ash structure.
    pub offset: usize,
    pub name: &'static str,
}

#[derive(Debug)]
pub struct BlockSchema {
    pub id: vk::StructureType,
    /// The C structure name, `VkPhysicalDeviceVulkan12Features`.
    pub name: &'static str,
    /// Short name, `Vulkan12`.  Used by configuration files.
    pub variant: &'static str,
    pub size: usize,
    /// Whether the block lives on the `p_next` chain.  Only the head block is not chained.
    pub chained: bool,
    /// Device extension introducing the block.
    pub extension: Option<&'static CStr>,
    /// Core API version that absorbed the extension.
    pub promoted: Option<u32>,
    pub fields: &'static [FieldDescriptor],
}

impl BlockSchema {
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn is_flag(&self, index: usize) -> bool {
        self.fields
            .get(index)
            .is_some_and(|f| f.kind == FieldKind::Bool)
    }

    /// Boolean fields with their schema indexes.
    pub fn flags(&self) -> impl Iterator<Item = (usize, &'static FieldDescriptor)> {
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.kind == FieldKind::Bool)
    }

    /// The extension that must be enabled to use this block on a device running `api_version`.
    pub fn required_extension(&self, api_version: u32) -> Option<&'static CStr> {
        self.extension
            .filter(|_| self.promoted.is_none_or(|promoted| api_version < promoted))
    }
}

/// Look up the schema for `id`.
///
/// Panics on unknown identifiers.  The registry is expected to cover every block callers name.
pub fn schema_for(id: vk::StructureType) -> &'static BlockSchema {
    try_schema_for(id).unwrap_or_else(|| {
        panic!("no capability schema for {id:?}, the registry is behind the Vulkan catalogue")
    })
}

pub fn try_schema_for(id: vk::StructureType) -> Option<&'static BlockSchema> {
    SCHEMAS.iter().find(|s| s.id == id)
}

/// Accepts the C name or the short variant name.
pub fn schema_by_name(name: &str) -> Option<&'static BlockSchema> {
    SCHEMAS
        .iter()
        .find(|s| s.name == name || s.variant == name)
}

capability_blocks! {
    /// Vulkan 1.0 toggles.  The head of every chain.
    head Core = vk::PhysicalDeviceFeatures [PHYSICAL_DEVICE_FEATURES_2] {
        robust_buffer_access,
        full_draw_index_uint32,
        image_cube_array,
        independent_blend,
        geometry_shader,
        tessellation_shader,
        sample_rate_shading,
        dual_src_blend,
        logic_op,
        multi_draw_indirect,
        draw_indirect_first_instance,
        depth_clamp,
        depth_bias_clamp,
        fill_mode_non_solid,
        depth_bounds,
        wide_lines,
        large_points,
        alpha_to_one,
        multi_viewport,
        sampler_anisotropy,
        texture_compression_etc2,
        texture_compression_astc_ldr,
        texture_compression_bc,
        occlusion_query_precise,
        pipeline_statistics_query,
        vertex_pipeline_stores_and_atomics,
        fragment_stores_and_atomics,
        shader_tessellation_and_geometry_point_size,
        shader_image_gather_extended,
        shader_storage_image_extended_formats,
        shader_storage_image_multisample,
        shader_storage_image_read_without_format,
        shader_storage_image_write_without_format,
        shader_uniform_buffer_array_dynamic_indexing,
        shader_sampled_image_array_dynamic_indexing,
        shader_storage_buffer_array_dynamic_indexing,
        shader_storage_image_array_dynamic_indexing,
        shader_clip_distance,
        shader_cull_distance,
        shader_float64,
        shader_int64,
        shader_int16,
        shader_resource_residency,
        shader_resource_min_lod,
        sparse_binding,
        sparse_residency_buffer,
        sparse_residency_image2_d,
        sparse_residency_image3_d,
        sparse_residency2_samples,
        sparse_residency4_samples,
        sparse_residency8_samples,
        sparse_residency16_samples,
        sparse_residency_aliased,
        variable_multisample_rate,
        inherited_queries,
    }

    Vulkan11 = vk::PhysicalDeviceVulkan11Features<'static> [PHYSICAL_DEVICE_VULKAN_1_1_FEATURES] {
        storage_buffer16_bit_access,
        uniform_and_storage_buffer16_bit_access,
        storage_push_constant16,
        storage_input_output16,
        multiview,
        multiview_geometry_shader,
        multiview_tessellation_shader,
        variable_pointers_storage_buffer,
        variable_pointers,
        protected_memory,
        sampler_ycbcr_conversion,
        shader_draw_parameters,
    }

    Vulkan12 = vk::PhysicalDeviceVulkan12Features<'static> [PHYSICAL_DEVICE_VULKAN_1_2_FEATURES] {
        sampler_mirror_clamp_to_edge,
        draw_indirect_count,
        storage_buffer8_bit_access,
        uniform_and_storage_buffer8_bit_access,
        storage_push_constant8,
        shader_buffer_int64_atomics,
        shader_shared_int64_atomics,
        shader_float16,
        shader_int8,
        descriptor_indexing,
        shader_input_attachment_array_dynamic_indexing,
        shader_uniform_texel_buffer_array_dynamic_indexing,
        shader_storage_texel_buffer_array_dynamic_indexing,
        shader_uniform_buffer_array_non_uniform_indexing,
        shader_sampled_image_array_non_uniform_indexing,
        shader_storage_buffer_array_non_uniform_indexing,
        shader_storage_image_array_non_uniform_indexing,
        shader_input_attachment_array_non_uniform_indexing,
        shader_uniform_texel_buffer_array_non_uniform_indexing,
        shader_storage_texel_buffer_array_non_uniform_indexing,
        descriptor_binding_uniform_buffer_update_after_bind,
        descriptor_binding_sampled_image_update_after_bind,
        descriptor_binding_storage_image_update_after_bind,
        descriptor_binding_storage_buffer_update_after_bind,
        descriptor_binding_uniform_texel_buffer_update_after_bind,
        descriptor_binding_storage_texel_buffer_update_after_bind,
        descriptor_binding_update_unused_while_pending,
        descriptor_binding_partially_bound,
        descriptor_binding_variable_descriptor_count,
        runtime_descriptor_array,
        sampler_filter_minmax,
        scalar_block_layout,
        imageless_framebuffer,
        uniform_buffer_standard_layout,
        shader_subgroup_extended_types,
        separate_depth_stencil_layouts,
        host_query_reset,
        timeline_semaphore,
        buffer_device_address,
        buffer_device_address_capture_replay,
        buffer_device_address_multi_device,
        vulkan_memory_model,
        vulkan_memory_model_device_scope,
        vulkan_memory_model_availability_visibility_chains,
        shader_output_viewport_index,
        shader_output_layer,
        subgroup_broadcast_dynamic_id,
    }

    Vulkan13 = vk::PhysicalDeviceVulkan13Features<'static> [PHYSICAL_DEVICE_VULKAN_1_3_FEATURES] {
        robust_image_access,
        inline_uniform_block,
        descriptor_binding_inline_uniform_block_update_after_bind,
        pipeline_creation_cache_control,
        private_data,
        shader_demote_to_helper_invocation,
        shader_terminate_invocation,
        subgroup_size_control,
        compute_full_subgroups,
        synchronization2,
        texture_compression_astc_hdr,
        shader_zero_initialize_workgroup_memory,
        dynamic_rendering,
        shader_integer_dot_product,
        maintenance4,
    }

    #[extension(vk::KHR_16BIT_STORAGE_NAME)]
    #[promoted(1, 1)]
    Storage16Bit = vk::PhysicalDevice16BitStorageFeatures<'static>
        [PHYSICAL_DEVICE_16BIT_STORAGE_FEATURES] {
        storage_buffer16_bit_access,
        uniform_and_storage_buffer16_bit_access,
        storage_push_constant16,
        storage_input_output16,
    }

    #[extension(vk::KHR_SHADER_FLOAT16_INT8_NAME)]
    #[promoted(1, 2)]
    ShaderFloat16Int8 = vk::PhysicalDeviceShaderFloat16Int8Features<'static>
        [PHYSICAL_DEVICE_SHADER_FLOAT16_INT8_FEATURES] {
        shader_float16,
        shader_int8,
    }

    #[extension(vk::KHR_TIMELINE_SEMAPHORE_NAME)]
    #[promoted(1, 2)]
    TimelineSemaphore = vk::PhysicalDeviceTimelineSemaphoreFeatures<'static>
        [PHYSICAL_DEVICE_TIMELINE_SEMAPHORE_FEATURES] {
        timeline_semaphore,
    }

    #[extension(vk::KHR_BUFFER_DEVICE_ADDRESS_NAME)]
    #[promoted(1, 2)]
    BufferDeviceAddress = vk::PhysicalDeviceBufferDeviceAddressFeatures<'static>
        [PHYSICAL_DEVICE_BUFFER_DEVICE_ADDRESS_FEATURES] {
        buffer_device_address,
        buffer_device_address_capture_replay,
        buffer_device_address_multi_device,
    }

    #[extension(vk::EXT_DESCRIPTOR_INDEXING_NAME)]
    #[promoted(1, 2)]
    DescriptorIndexing = vk::PhysicalDeviceDescriptorIndexingFeatures<'static>
        [PHYSICAL_DEVICE_DESCRIPTOR_INDEXING_FEATURES] {
        shader_input_attachment_array_dynamic_indexing,
        shader_uniform_texel_buffer_array_dynamic_indexing,
        shader_storage_texel_buffer_array_dynamic_indexing,
        shader_uniform_buffer_array_non_uniform_indexing,
        shader_sampled_image_array_non_uniform_indexing,
        shader_storage_buffer_array_non_uniform_indexing,
        shader_storage_image_array_non_uniform_indexing,
        shader_input_attachment_array_non_uniform_indexing,
        shader_uniform_texel_buffer_array_non_uniform_indexing,
        shader_storage_texel_buffer_array_non_uniform_indexing,
        descriptor_binding_uniform_buffer_update_after_bind,
        descriptor_binding_sampled_image_update_after_bind,
        descriptor_binding_storage_image_update_after_bind,
        descriptor_binding_storage_buffer_update_after_bind,
        descriptor_binding_uniform_texel_buffer_update_after_bind,
        descriptor_binding_storage_texel_buffer_update_after_bind,
        descriptor_binding_update_unused_while_pending,
        descriptor_binding_partially_bound,
        descriptor_binding_variable_descriptor_count,
        runtime_descriptor_array,
    }

    #[extension(vk::KHR_SYNCHRONIZATION2_NAME)]
    #[promoted(1, 3)]
    Synchronization2 = vk::PhysicalDeviceSynchronization2Features<'static>
        [PHYSICAL_DEVICE_SYNCHRONIZATION_2_FEATURES] {
        synchronization2,
    }

    #[extension(vk::KHR_DYNAMIC_RENDERING_NAME)]
    #[promoted(1, 3)]
    DynamicRendering = vk::PhysicalDeviceDynamicRenderingFeatures<'static>
        [PHYSICAL_DEVICE_DYNAMIC_RENDERING_FEATURES] {
        dynamic_rendering,
    }

    #[extension(vk::KHR_MAINTENANCE4_NAME)]
    #[promoted(1, 3)]
    Maintenance4 = vk::PhysicalDeviceMaintenance4Features<'static>
        [PHYSICAL_DEVICE_MAINTENANCE_4_FEATURES] {
        maintenance4,
    }

    #[extension(vk::EXT_EXTENDED_DYNAMIC_STATE_NAME)]
    #[promoted(1, 3)]
    ExtendedDynamicState = vk::PhysicalDeviceExtendedDynamicStateFeaturesEXT<'static>
        [PHYSICAL_DEVICE_EXTENDED_DYNAMIC_STATE_FEATURES_EXT] {
        extended_dynamic_state,
    }

    #[extension(vk::EXT_EXTENDED_DYNAMIC_STATE2_NAME)]
    #[promoted(1, 3)]
    ExtendedDynamicState2 = vk::PhysicalDeviceExtendedDynamicState2FeaturesEXT<'static>
        [PHYSICAL_DEVICE_EXTENDED_DYNAMIC_STATE_2_FEATURES_EXT] {
        extended_dynamic_state2,
        extended_dynamic_state2_logic_op,
        extended_dynamic_state2_patch_control_points,
    }

    #[extension(vk::EXT_EXTENDED_DYNAMIC_STATE3_NAME)]
    ExtendedDynamicState3 = vk::PhysicalDeviceExtendedDynamicState3FeaturesEXT<'static>
        [PHYSICAL_DEVICE_EXTENDED_DYNAMIC_STATE_3_FEATURES_EXT] {
        extended_dynamic_state3_tessellation_domain_origin,
        extended_dynamic_state3_depth_clamp_enable,
        extended_dynamic_state3_polygon_mode,
        extended_dynamic_state3_rasterization_samples,
        extended_dynamic_state3_sample_mask,
        extended_dynamic_state3_alpha_to_coverage_enable,
        extended_dynamic_state3_alpha_to_one_enable,
        extended_dynamic_state3_logic_op_enable,
        extended_dynamic_state3_color_blend_enable,
        extended_dynamic_state3_color_blend_equation,
        extended_dynamic_state3_color_write_mask,
        extended_dynamic_state3_rasterization_stream,
        extended_dynamic_state3_conservative_rasterization_mode,
        extended_dynamic_state3_extra_primitive_overestimation_size,
        extended_dynamic_state3_depth_clip_enable,
        extended_dynamic_state3_sample_locations_enable,
        extended_dynamic_state3_color_blend_advanced,
        extended_dynamic_state3_provoking_vertex_mode,
        extended_dynamic_state3_line_rasterization_mode,
        extended_dynamic_state3_line_stipple_enable,
        extended_dynamic_state3_depth_clip_negative_one_to_one,
        extended_dynamic_state3_viewport_w_scaling_enable,
        extended_dynamic_state3_viewport_swizzle,
        extended_dynamic_state3_coverage_to_color_enable,
        extended_dynamic_state3_coverage_to_color_location,
        extended_dynamic_state3_coverage_modulation_mode,
        extended_dynamic_state3_coverage_modulation_table_enable,
        extended_dynamic_state3_coverage_modulation_table,
        extended_dynamic_state3_coverage_reduction_mode,
        extended_dynamic_state3_representative_fragment_test_enable,
        extended_dynamic_state3_shading_rate_image_enable,
    }

    #[extension(vk::EXT_GRAPHICS_PIPELINE_LIBRARY_NAME)]
    GraphicsPipelineLibrary = vk::PhysicalDeviceGraphicsPipelineLibraryFeaturesEXT<'static>
        [PHYSICAL_DEVICE_GRAPHICS_PIPELINE_LIBRARY_FEATURES_EXT] {
        graphics_pipeline_library,
    }

    #[extension(vk::EXT_SWAPCHAIN_MAINTENANCE1_NAME)]
    SwapchainMaintenance1 = vk::PhysicalDeviceSwapchainMaintenance1FeaturesEXT<'static>
        [PHYSICAL_DEVICE_SWAPCHAIN_MAINTENANCE_1_FEATURES_EXT] {
        swapchain_maintenance1,
    }

    #[extension(vk::EXT_LINE_RASTERIZATION_NAME)]
    LineRasterization = vk::PhysicalDeviceLineRasterizationFeaturesEXT<'static>
        [PHYSICAL_DEVICE_LINE_RASTERIZATION_FEATURES_EXT] {
        rectangular_lines,
        bresenham_lines,
        smooth_lines,
        stippled_rectangular_lines,
        stippled_bresenham_lines,
        stippled_smooth_lines,
    }

    #[extension(vk::KHR_PRESENT_ID_NAME)]
    PresentId = vk::PhysicalDevicePresentIdFeaturesKHR<'static>
        [PHYSICAL_DEVICE_PRESENT_ID_FEATURES_KHR] {
        present_id,
    }

    #[extension(vk::KHR_PRESENT_WAIT_NAME)]
    PresentWait = vk::PhysicalDevicePresentWaitFeaturesKHR<'static>
        [PHYSICAL_DEVICE_PRESENT_WAIT_FEATURES_KHR] {
        present_wait,
    }

    #[extension(vk::EXT_DESCRIPTOR_BUFFER_NAME)]
    DescriptorBuffer = vk::PhysicalDeviceDescriptorBufferFeaturesEXT<'static>
        [PHYSICAL_DEVICE_DESCRIPTOR_BUFFER_FEATURES_EXT] {
        descriptor_buffer,
        descriptor_buffer_capture_replay,
        descriptor_buffer_image_layout_ignored,
        descriptor_buffer_push_descriptors,
    }

    #[extension(vk::EXT_SHADER_OBJECT_NAME)]
    ShaderObject = vk::PhysicalDeviceShaderObjectFeaturesEXT<'static>
        [PHYSICAL_DEVICE_SHADER_OBJECT_FEATURES_EXT] {
        shader_object,
    }

    #[extension(vk::KHR_MAINTENANCE5_NAME)]
    Maintenance5 = vk::PhysicalDeviceMaintenance5FeaturesKHR<'static>
        [PHYSICAL_DEVICE_MAINTENANCE_5_FEATURES_KHR] {
        maintenance5,
    }

    #[extension(vk::EXT_MEMORY_PRIORITY_NAME)]
    MemoryPriority = vk::PhysicalDeviceMemoryPriorityFeaturesEXT<'static>
        [PHYSICAL_DEVICE_MEMORY_PRIORITY_FEATURES_EXT] {
        memory_priority,
    }

    #[extension(vk::EXT_MESH_SHADER_NAME)]
    MeshShader = vk::PhysicalDeviceMeshShaderFeaturesEXT<'static>
        [PHYSICAL_DEVICE_MESH_SHADER_FEATURES_EXT] {
        task_shader,
        mesh_shader,
        multiview_mesh_shader,
        primitive_fragment_shading_rate_mesh_shader,
        mesh_shader_queries,
    }

    #[extension(vk::EXT_ROBUSTNESS2_NAME)]
    Robustness2 = vk::PhysicalDeviceRobustness2FeaturesEXT<'static>
        [PHYSICAL_DEVICE_ROBUSTNESS_2_FEATURES_EXT] {
        robust_buffer_access2,
        robust_image_access2,
        null_descriptor,
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_every_schema_instantiates() {
        for schema in SCHEMAS {
            let block = Block::new(schema.id).unwrap();
            assert_eq!(block.id(), schema.id);
            assert_eq!(block.schema().name, schema.name);
            for (i, _) in schema.flags() {
                assert_eq!(block.flag(i), Some(false), "{}.{i}", schema.name);
            }
        }
    }

    #[test]
    fn test_non_flag_fields_are_not_accessible() {
        let mut block = Block::new(vk::StructureType::PHYSICAL_DEVICE_VULKAN_1_2_FEATURES).unwrap();
        assert_eq!(block.flag(0), None);
        assert_eq!(block.flag(1), None);
        assert!(!block.set_flag(1, true));
        assert!(!block.set_flag(block.schema().fields.len(), true));
    }

    #[test]
    fn test_field_layout_is_sane() {
        let mut names = HashSet::new();
        let mut ids = HashSet::new();
        for schema in SCHEMAS {
            assert!(names.insert(schema.name));
            assert!(ids.insert(schema.id));
            assert!(schema.fields.windows(2).all(|w| w[0].offset < w[1].offset));
            assert!(schema.fields.iter().all(|f| f.offset < schema.size));
            if schema.chained {
                assert_eq!(schema.fields[0].kind, FieldKind::StructureType);
                assert_eq!(schema.fields[0].offset, 0);
                assert_eq!(schema.fields[1].kind, FieldKind::Pointer);
            } else {
                assert_eq!(schema.id, HEAD_BLOCK);
                assert!(schema.fields.iter().all(|f| f.kind == FieldKind::Bool));
            }
        }
    }

    #[test]
    fn test_lookup_by_name() {
        let by_c_name = schema_by_name("VkPhysicalDeviceVulkan12Features").unwrap();
        let by_variant = schema_by_name("Vulkan12").unwrap();
        assert_eq!(by_c_name.id, by_variant.id);
        assert_eq!(by_c_name.field_index("s_type"), Some(0));
        assert_eq!(by_c_name.field_index("sampler_mirror_clamp_to_edge"), Some(2));
        assert!(by_c_name.is_flag(2));
        assert!(!by_c_name.is_flag(1));
        assert!(schema_by_name("VkPhysicalDeviceNonsense").is_none());

        let core = schema_for(HEAD_BLOCK);
        assert_eq!(core.name, "VkPhysicalDeviceFeatures");
        assert_eq!(core.field_index("robust_buffer_access"), Some(0));
    }

    #[test]
    fn test_required_extension_respects_promotion() {
        let sync2 = schema_for(vk::StructureType::PHYSICAL_DEVICE_SYNCHRONIZATION_2_FEATURES);
        assert_eq!(
            sync2.required_extension(vk::API_VERSION_1_2),
            Some(vk::KHR_SYNCHRONIZATION2_NAME)
        );
        assert_eq!(sync2.required_extension(vk::API_VERSION_1_3), None);

        let eds3 = schema_for(vk::StructureType::PHYSICAL_DEVICE_EXTENDED_DYNAMIC_STATE_3_FEATURES_EXT);
        assert!(eds3.required_extension(vk::API_VERSION_1_3).is_some());
        assert_eq!(schema_for(HEAD_BLOCK).required_extension(vk::API_VERSION_1_0), None);
    }

    #[test]
    #[should_panic(expected = "no capability schema")]
    fn test_unknown_schema_panics() {
        schema_for(vk::StructureType::APPLICATION_INFO);
    }
}
