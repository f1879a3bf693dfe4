// Copyright 2026 The MuTate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Runtime
//!
//! Everything selection needs from the driver, as one narrow trait.  [`InstanceRuntime`] is the real
//! thing backed by an `ash::Instance`.  Tests drive the selector with an in-memory runtime instead.
//!
//! Adapters are plain `vk::PhysicalDevice` handles.  Fake runtimes can mint them with
//! `vk::Handle::from_raw`.

mod instance;

pub use instance::InstanceRuntime;

use std::ffi::CString;

use ash::{prelude::VkResult, vk};

use crate::chain::CapabilityChain;

/// One snapshot of what the driver says about an adapter.
#[derive(Clone, Debug)]
pub struct AdapterProperties {
    pub name: String,
    pub device_type: vk::PhysicalDeviceType,
    pub vendor_id: u32,
    pub device_id: u32,
    pub api_version: u32,
    pub driver_version: u32,
    pub driver_name: String,
    pub driver_info: String,
    /// As reported.  May be zeros.
    pub device_uuid: [u8; 16],
    pub limits: vk::PhysicalDeviceLimits,
    pub max_memory_allocation_size: vk::DeviceSize,
    pub subgroup_size: u32,
    pub min_subgroup_size: u32,
    pub max_subgroup_size: u32,
    pub max_compute_workgroup_subgroups: u32,
    /// See [`crate::util::device_local_memory`].
    pub device_local_memory: vk::DeviceSize,
}

impl Default for AdapterProperties {
    fn default() -> Self {
        Self {
            name: String::new(),
            device_type: vk::PhysicalDeviceType::OTHER,
            vendor_id: 0,
            device_id: 0,
            api_version: 0,
            driver_version: 0,
            driver_name: String::new(),
            driver_info: String::new(),
            device_uuid: [0; 16],
            limits: vk::PhysicalDeviceLimits::default(),
            max_memory_allocation_size: 0,
            subgroup_size: 0,
            min_subgroup_size: 0,
            max_subgroup_size: 0,
            max_compute_workgroup_subgroups: 0,
            device_local_memory: 0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueFamily {
    pub flags: vk::QueueFlags,
    pub count: u32,
}

pub trait Runtime {
    /// Whatever device creation hands back.  `ash::Device` for real drivers.
    type Device;

    fn enumerate_adapters(&self) -> VkResult<Vec<vk::PhysicalDevice>>;

    fn properties(&self, adapter: vk::PhysicalDevice) -> AdapterProperties;

    fn extensions(&self, adapter: vk::PhysicalDevice) -> VkResult<Vec<CString>>;

    /// Fill every block already present in `chain` with live values.
    fn features(&self, adapter: vk::PhysicalDevice, chain: &mut CapabilityChain);

    /// Optimal tiling features for `format`.
    fn format_features(
        &self,
        adapter: vk::PhysicalDevice,
        format: vk::Format,
    ) -> vk::FormatFeatureFlags2;

    fn queue_families(&self, adapter: vk::PhysicalDevice) -> Vec<QueueFamily>;

    fn presentation_support(
        &self,
        adapter: vk::PhysicalDevice,
        family: u32,
        surface: vk::SurfaceKHR,
    ) -> VkResult<bool>;

    /// # Safety
    ///
    /// Every pointer reachable from `info` must be valid for the duration of the call.
    unsafe fn create_device(
        &self,
        adapter: vk::PhysicalDevice,
        info: &vk::DeviceCreateInfo<'_>,
    ) -> VkResult<Self::Device>;
}
