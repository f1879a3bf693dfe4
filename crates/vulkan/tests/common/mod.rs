// Copyright 2026 The MuTate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! An in-memory driver.  Adapters are described up front and every query answers from that.

#![allow(dead_code)]

use std::{
    cell::RefCell,
    ffi::{CStr, CString},
};

use ash::{
    prelude::VkResult,
    vk::{self, Handle},
};
use mutate_vulkan::{
    chain::CapabilityChain,
    registry::{schema_for, HEAD_BLOCK},
    runtime::{AdapterProperties, QueueFamily, Runtime},
};

pub const GCT: vk::QueueFlags = vk::QueueFlags::from_raw(
    vk::QueueFlags::GRAPHICS.as_raw()
        | vk::QueueFlags::COMPUTE.as_raw()
        | vk::QueueFlags::TRANSFER.as_raw(),
);

pub const V12: vk::StructureType = vk::StructureType::PHYSICAL_DEVICE_VULKAN_1_2_FEATURES;
pub const V13: vk::StructureType = vk::StructureType::PHYSICAL_DEVICE_VULKAN_1_3_FEATURES;

pub fn field(id: vk::StructureType, name: &str) -> usize {
    schema_for(id).field_index(name).unwrap()
}

#[derive(Clone, Debug)]
pub struct FakeAdapter {
    pub properties: AdapterProperties,
    pub extensions: Vec<CString>,
    /// Live feature values.  Blocks not present read as all false.
    pub features: CapabilityChain,
    pub formats: Vec<(vk::Format, vk::FormatFeatureFlags2)>,
    pub families: Vec<QueueFamily>,
    /// Families that can present.  Empty means all of them.
    pub presenting: Vec<u32>,
}

impl FakeAdapter {
    pub fn new(name: &str, device_type: vk::PhysicalDeviceType, api_version: u32) -> Self {
        Self {
            properties: AdapterProperties {
                name: name.into(),
                device_type,
                api_version,
                vendor_id: 0x1002,
                device_id: 0x73bf,
                ..Default::default()
            },
            extensions: Vec::new(),
            features: CapabilityChain::new(),
            formats: Vec::new(),
            families: vec![QueueFamily {
                flags: GCT,
                count: 4,
            }],
            presenting: Vec::new(),
        }
    }

    pub fn extension(mut self, name: &CStr) -> Self {
        self.extensions.push(name.to_owned());
        self
    }

    pub fn flag(mut self, id: vk::StructureType, name: &str) -> Self {
        self.features.set_flags(id, &[field(id, name)]);
        self
    }

    pub fn families(mut self, families: &[(vk::QueueFlags, u32)]) -> Self {
        self.families = families
            .iter()
            .map(|&(flags, count)| QueueFamily { flags, count })
            .collect();
        self
    }

    pub fn memory(mut self, bytes: u64) -> Self {
        self.properties.device_local_memory = bytes;
        self
    }
}

/// What device creation was handed.
#[derive(Debug)]
pub struct CreatedDevice {
    pub adapter: vk::PhysicalDevice,
    pub extensions: Vec<CString>,
    /// Family and priorities of each queue create info.
    pub queues: Vec<(u32, Vec<f32>)>,
    /// Structure types reachable from `p_next`, in order.
    pub chain: Vec<vk::StructureType>,
}

#[derive(Default)]
pub struct FakeRuntime {
    pub adapters: Vec<FakeAdapter>,
    pub enumerate_error: Option<vk::Result>,
    pub create_error: Option<vk::Result>,
    /// Adapters in the order their extensions were queried.
    pub probed: RefCell<Vec<vk::PhysicalDevice>>,
}

pub fn handle(index: usize) -> vk::PhysicalDevice {
    vk::PhysicalDevice::from_raw(index as u64 + 1)
}

impl FakeRuntime {
    pub fn new(adapters: Vec<FakeAdapter>) -> Self {
        Self {
            adapters,
            ..Default::default()
        }
    }

    fn adapter(&self, handle: vk::PhysicalDevice) -> &FakeAdapter {
        &self.adapters[handle.as_raw() as usize - 1]
    }
}

impl Runtime for FakeRuntime {
    type Device = CreatedDevice;

    fn enumerate_adapters(&self) -> VkResult<Vec<vk::PhysicalDevice>> {
        match self.enumerate_error {
            Some(e) => Err(e),
            None => Ok((0..self.adapters.len()).map(handle).collect()),
        }
    }

    fn properties(&self, adapter: vk::PhysicalDevice) -> AdapterProperties {
        self.adapter(adapter).properties.clone()
    }

    fn extensions(&self, adapter: vk::PhysicalDevice) -> VkResult<Vec<CString>> {
        self.probed.borrow_mut().push(adapter);
        Ok(self.adapter(adapter).extensions.clone())
    }

    fn features(&self, adapter: vk::PhysicalDevice, chain: &mut CapabilityChain) {
        let live = &self.adapter(adapter).features;
        let ids: Vec<_> = std::iter::once(HEAD_BLOCK).chain(chain.ids()).collect();
        for id in ids {
            if let Some(block) = live.get(id) {
                *chain.ensure_block(id) = *block;
            }
        }
    }

    fn format_features(
        &self,
        adapter: vk::PhysicalDevice,
        format: vk::Format,
    ) -> vk::FormatFeatureFlags2 {
        self.adapter(adapter)
            .formats
            .iter()
            .find(|(f, _)| *f == format)
            .map_or(vk::FormatFeatureFlags2::empty(), |(_, flags)| *flags)
    }

    fn queue_families(&self, adapter: vk::PhysicalDevice) -> Vec<QueueFamily> {
        self.adapter(adapter).families.clone()
    }

    fn presentation_support(
        &self,
        adapter: vk::PhysicalDevice,
        family: u32,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<bool> {
        let presenting = &self.adapter(adapter).presenting;
        Ok(presenting.is_empty() || presenting.contains(&family))
    }

    unsafe fn create_device(
        &self,
        adapter: vk::PhysicalDevice,
        info: &vk::DeviceCreateInfo<'_>,
    ) -> VkResult<CreatedDevice> {
        if let Some(e) = self.create_error {
            return Err(e);
        }
        let extensions = unsafe {
            std::slice::from_raw_parts(
                info.pp_enabled_extension_names,
                info.enabled_extension_count as usize,
            )
            .iter()
            .map(|p| CStr::from_ptr(*p).to_owned())
            .collect()
        };
        let queues = unsafe {
            std::slice::from_raw_parts(
                info.p_queue_create_infos,
                info.queue_create_info_count as usize,
            )
            .iter()
            .map(|ci| {
                let priorities =
                    std::slice::from_raw_parts(ci.p_queue_priorities, ci.queue_count as usize);
                (ci.queue_family_index, priorities.to_vec())
            })
            .collect()
        };
        let mut chain = Vec::new();
        let mut next = info.p_next as *const vk::BaseInStructure<'_>;
        while !next.is_null() {
            unsafe {
                chain.push((*next).s_type);
                next = (*next).p_next;
            }
        }
        Ok(CreatedDevice {
            adapter,
            extensions,
            queues,
            chain,
        })
    }
}
