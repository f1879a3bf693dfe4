// Copyright 2026 The MuTate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::ffi::{CStr, CString};

use ash::{khr, prelude::VkResult, vk};

use super::{AdapterProperties, QueueFamily, Runtime};
use crate::{chain::CapabilityChain, util};

/// [`Runtime`] over a live instance.  Borrowed, the context owns the instance.
pub struct InstanceRuntime<'a> {
    instance: &'a ash::Instance,
    surface: Option<&'a khr::surface::Instance>,
}

impl<'a> InstanceRuntime<'a> {
    pub fn new(instance: &'a ash::Instance) -> Self {
        Self {
            instance,
            surface: None,
        }
    }

    /// Needed for presentation checks.  Without it every surface query fails.
    pub fn with_surface_loader(mut self, loader: &'a khr::surface::Instance) -> Self {
        self.surface = Some(loader);
        self
    }
}

/// Property structures a device can answer, by the API version it reports.
#[derive(Debug, PartialEq, Eq)]
struct PropertyQuery {
    /// ID, subgroup and maintenance3 properties, and `vkGetPhysicalDeviceProperties2` itself.
    core11: bool,
    driver: bool,
    subgroup_control: bool,
}

impl PropertyQuery {
    fn for_version(api_version: u32) -> Self {
        Self {
            core11: api_version >= vk::API_VERSION_1_1,
            driver: api_version >= vk::API_VERSION_1_2,
            subgroup_control: api_version >= vk::API_VERSION_1_3,
        }
    }
}

fn c_string(s: Result<&CStr, std::ffi::FromBytesUntilNulError>) -> String {
    s.map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl Runtime for InstanceRuntime<'_> {
    type Device = ash::Device;

    fn enumerate_adapters(&self) -> VkResult<Vec<vk::PhysicalDevice>> {
        unsafe { self.instance.enumerate_physical_devices() }
    }

    fn properties(&self, adapter: vk::PhysicalDevice) -> AdapterProperties {
        let base = unsafe { self.instance.get_physical_device_properties(adapter) };
        let mut id = vk::PhysicalDeviceIDProperties::default();
        let mut subgroup = vk::PhysicalDeviceSubgroupProperties::default();
        let mut maintenance3 = vk::PhysicalDeviceMaintenance3Properties::default();
        let mut driver = vk::PhysicalDeviceDriverProperties::default();
        let mut subgroup_control = vk::PhysicalDeviceSubgroupSizeControlProperties::default();

        // Only chain what the device version guarantees.  Drivers are allowed to choke on the rest.
        let query = PropertyQuery::for_version(base.api_version);
        if query.core11 {
            let mut props2 = vk::PhysicalDeviceProperties2::default()
                .push_next(&mut id)
                .push_next(&mut subgroup)
                .push_next(&mut maintenance3);
            if query.driver {
                props2 = props2.push_next(&mut driver);
            }
            if query.subgroup_control {
                props2 = props2.push_next(&mut subgroup_control);
            }
            unsafe {
                self.instance
                    .get_physical_device_properties2(adapter, &mut props2)
            };
        }

        let memory = unsafe {
            self.instance
                .get_physical_device_memory_properties(adapter)
        };

        AdapterProperties {
            name: c_string(base.device_name_as_c_str()),
            device_type: base.device_type,
            vendor_id: base.vendor_id,
            device_id: base.device_id,
            api_version: base.api_version,
            driver_version: base.driver_version,
            driver_name: c_string(driver.driver_name_as_c_str()),
            driver_info: c_string(driver.driver_info_as_c_str()),
            device_uuid: id.device_uuid,
            limits: base.limits,
            max_memory_allocation_size: maintenance3.max_memory_allocation_size,
            subgroup_size: subgroup.subgroup_size,
            min_subgroup_size: subgroup_control.min_subgroup_size,
            max_subgroup_size: subgroup_control.max_subgroup_size,
            max_compute_workgroup_subgroups: subgroup_control.max_compute_workgroup_subgroups,
            device_local_memory: util::device_local_memory(&memory),
        }
    }

    fn extensions(&self, adapter: vk::PhysicalDevice) -> VkResult<Vec<CString>> {
        let props = unsafe {
            self.instance
                .enumerate_device_extension_properties(adapter)?
        };
        Ok(props
            .iter()
            .filter_map(|p| p.extension_name_as_c_str().ok().map(CStr::to_owned))
            .collect())
    }

    fn features(&self, adapter: vk::PhysicalDevice, chain: &mut CapabilityChain) {
        chain.with_features2(|features2| unsafe {
            self.instance
                .get_physical_device_features2(adapter, features2)
        });
    }

    fn format_features(
        &self,
        adapter: vk::PhysicalDevice,
        format: vk::Format,
    ) -> vk::FormatFeatureFlags2 {
        let mut props3 = vk::FormatProperties3::default();
        let legacy = {
            let mut props2 = vk::FormatProperties2::default().push_next(&mut props3);
            unsafe {
                self.instance
                    .get_physical_device_format_properties2(adapter, format, &mut props2)
            };
            props2.format_properties.optimal_tiling_features
        };
        // The 32 bit flags are the low half of the 64 bit ones.  Drivers without
        // VK_KHR_format_feature_flags2 leave `props3` zeroed.
        vk::FormatFeatureFlags2::from_raw(legacy.as_raw() as u64) | props3.optimal_tiling_features
    }

    fn queue_families(&self, adapter: vk::PhysicalDevice) -> Vec<QueueFamily> {
        unsafe {
            self.instance
                .get_physical_device_queue_family_properties(adapter)
        }
        .iter()
        .map(|qf| QueueFamily {
            flags: qf.queue_flags,
            count: qf.queue_count,
        })
        .collect()
    }

    fn presentation_support(
        &self,
        adapter: vk::PhysicalDevice,
        family: u32,
        surface: vk::SurfaceKHR,
    ) -> VkResult<bool> {
        let Some(loader) = self.surface else {
            return Err(vk::Result::ERROR_EXTENSION_NOT_PRESENT);
        };
        unsafe { loader.get_physical_device_surface_support(adapter, family, surface) }
    }

    unsafe fn create_device(
        &self,
        adapter: vk::PhysicalDevice,
        info: &vk::DeviceCreateInfo<'_>,
    ) -> VkResult<ash::Device> {
        unsafe { self.instance.create_device(adapter, info, None) }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_property_query_follows_version() {
        let none = PropertyQuery {
            core11: false,
            driver: false,
            subgroup_control: false,
        };
        assert_eq!(PropertyQuery::for_version(vk::API_VERSION_1_0), none);
        assert_eq!(
            PropertyQuery::for_version(vk::make_api_version(0, 1, 0, 250)),
            none
        );
        assert_eq!(
            PropertyQuery::for_version(vk::API_VERSION_1_1),
            PropertyQuery {
                core11: true,
                ..none
            }
        );
        assert_eq!(
            PropertyQuery::for_version(vk::make_api_version(0, 1, 2, 198)),
            PropertyQuery {
                core11: true,
                driver: true,
                subgroup_control: false,
            }
        );
        assert_eq!(
            PropertyQuery::for_version(vk::make_api_version(0, 1, 4, 303)),
            PropertyQuery {
                core11: true,
                driver: true,
                subgroup_control: true,
            }
        );
    }
}
