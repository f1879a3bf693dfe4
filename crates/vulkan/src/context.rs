// Copyright 2026 The MuTate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Context
//!
//! Fundamentally required resources, including the entry, instance, hardware devices
//! are encapsulated by `VkContext`.
//!
//! [`VkInstance`] is the part that exists before a device is picked.  Listing adapters only needs
//! that much.  [`VkContext`] adds the selected device and its queues.
//!
//! *NEXT* Device-lost recovery means running selection again with the same requirements.  The
//! instance should survive that, which is why it's split out.

use std::{
    env,
    ffi::{c_char, CStr},
};

use ash::{khr, vk};
use log::{info, warn};

use crate::{
    identity::AdapterId,
    probe::Probe,
    queue::Queues,
    requirements::RequirementSet,
    runtime::InstanceRuntime,
    select::{SelectError, Selector},
};

static VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Any non-empty value turns validation on.
pub const VALIDATION_ENV: &str = "MUTATE_VALIDATION";

pub struct VkInstance {
    pub entry: ash::Entry,
    pub instance: ash::Instance,
    /// Used to access surface creation functions
    pub surface_loader: khr::surface::Instance,
    pub api_version: u32,
}

impl VkInstance {
    /// Load Vulkan and create an instance with `extensions` enabled.
    pub fn new(api_version: u32, validation: bool, extensions: &[&CStr]) -> Result<Self, SelectError> {
        let extensions: Vec<*const c_char> = extensions.iter().map(|e| e.as_ptr()).collect();
        Self::create(api_version, validation, &extensions)
    }

    /// An instance that can create surfaces for `display`.
    #[cfg(feature = "window")]
    pub fn for_display(
        api_version: u32,
        validation: bool,
        display: raw_window_handle::RawDisplayHandle,
    ) -> Result<Self, SelectError> {
        let extensions = ash_window::enumerate_required_extensions(display)?;
        Self::create(api_version, validation, extensions)
    }

    fn create(
        api_version: u32,
        validation: bool,
        extensions: &[*const c_char],
    ) -> Result<Self, SelectError> {
        let entry = unsafe { ash::Entry::load()? };

        let validation = validation || env::var_os(VALIDATION_ENV).is_some_and(|v| !v.is_empty());
        let mut layers = Vec::new();
        if validation {
            let available = unsafe { entry.enumerate_instance_layer_properties()? };
            if available
                .iter()
                .any(|l| l.layer_name_as_c_str().is_ok_and(|n| n == VALIDATION_LAYER))
            {
                layers.push(VALIDATION_LAYER.as_ptr());
            } else {
                warn!("validation requested but {VALIDATION_LAYER:?} is not installed");
            }
        }

        let app_info = vk::ApplicationInfo::default()
            .application_name(c"mutate")
            .api_version(api_version);
        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(extensions)
            .enabled_layer_names(&layers);

        let instance = unsafe { entry.create_instance(&create_info, None)? };
        let surface_loader = khr::surface::Instance::new(&entry, &instance);
        Ok(Self {
            entry,
            instance,
            surface_loader,
            api_version,
        })
    }

    /// # Safety
    ///
    /// `display` and `window` must stay valid for the life of the surface.
    #[cfg(feature = "window")]
    pub unsafe fn create_surface(
        &self,
        display: raw_window_handle::RawDisplayHandle,
        window: raw_window_handle::RawWindowHandle,
    ) -> Result<vk::SurfaceKHR, SelectError> {
        let surface = unsafe {
            ash_window::create_surface(&self.entry, &self.instance, display, window, None)?
        };
        Ok(surface)
    }

    pub fn runtime(&self) -> InstanceRuntime<'_> {
        InstanceRuntime::new(&self.instance).with_surface_loader(&self.surface_loader)
    }

    pub fn destroy(&self) {
        unsafe { self.instance.destroy_instance(None) };
    }
}

pub struct VkContext {
    pub instance: VkInstance,
    pub surface: Option<vk::SurfaceKHR>,

    pub physical_device: vk::PhysicalDevice,
    pub adapter_id: AdapterId,
    /// Vulkan logical device
    pub device: ash::Device,
    /// Queues for device in use.
    pub queues: Queues,
    /// What the device was created with.
    pub probe: Probe,
}

impl VkContext {
    /// Select and create a device.  `surface`, when given, becomes the presentation target.
    ///
    /// On failure the instance and surface are destroyed before the error is returned.
    pub fn new(
        instance: VkInstance,
        surface: Option<vk::SurfaceKHR>,
        reqs: &mut RequirementSet,
    ) -> Result<Self, SelectError> {
        if reqs.min_api_version() > instance.api_version {
            warn!(
                "instance API {} is older than the required device API {}",
                crate::util::ApiVersion(instance.api_version),
                crate::util::ApiVersion(reqs.min_api_version())
            );
        }
        reqs.set_surface(surface);

        let selected = {
            let runtime = instance.runtime();
            Selector::new(&runtime, reqs).select()
        };
        let selected = match selected {
            Ok(selected) => selected,
            Err(e) => {
                if let Some(surface) = surface {
                    unsafe { instance.surface_loader.destroy_surface(surface, None) };
                }
                instance.destroy();
                return Err(e);
            }
        };

        let queues = Queues::new(&selected.device, selected.queue_plan());
        info!(
            "device ready, graphics family {}",
            queues.graphics_family_index()
        );
        Ok(Self {
            instance,
            surface,
            physical_device: selected.adapter,
            adapter_id: selected.id,
            device: selected.device,
            queues,
            probe: selected.probe,
        })
    }

    /// Headless device on a fresh instance.
    pub fn headless(reqs: &mut RequirementSet, validation: bool) -> Result<Self, SelectError> {
        let instance = VkInstance::new(reqs.min_api_version(), validation, &[])?;
        Self::new(instance, None, reqs)
    }

    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    // XXX in reality, this consumes the context, but ownership friction needs worked out.
    pub fn destroy(&self) {
        unsafe {
            self.device.destroy_device(None);
            if let Some(surface) = self.surface {
                self.instance
                    .surface_loader
                    .destroy_surface(surface, None);
            }
        }
        self.instance.destroy();
    }
}
