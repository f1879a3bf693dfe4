// Copyright 2026 The MuTate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Requirements
//!
//! What the caller wants from a device.  Extensions and feature flags come in required and optional
//! flavors.  Formats are always required.
//!
//! The required and optional chains are kept the same shape so that the prober can walk them in
//! lockstep with the live chain.  Start with [`RequirementSet::init_blocks`], then add flags.
//!
//! An extension may be required or optional, never both.  The conflicting call returns
//! [`SelectError::ExtensionConflict`] and the caller owns the abort, usually through
//! [`crate::select::fatal`].
//!
//! ```ignore
//! let mut reqs = RequirementSet::builder().min_api_version(vk::API_VERSION_1_3).build();
//! reqs.require_extension(vk::KHR_SWAPCHAIN_NAME)?;
//! reqs.init_blocks(&[vk::StructureType::PHYSICAL_DEVICE_VULKAN_1_2_FEATURES]);
//! reqs.require_flags(vk::StructureType::PHYSICAL_DEVICE_VULKAN_1_2_FEATURES, &[timeline]);
//! ```

use std::ffi::{CStr, CString};

use ash::vk;

use crate::{chain::CapabilityChain, identity::AdapterId, select::SelectError};

#[derive(Clone, Debug)]
pub struct RequirementSet {
    required_extensions: Vec<CString>,
    optional_extensions: Vec<CString>,
    required: CapabilityChain,
    optional: CapabilityChain,
    formats: Vec<(vk::Format, vk::FormatFeatureFlags2)>,
    preferred: Option<AdapterId>,
    min_api_version: u32,
    surface: Option<vk::SurfaceKHR>,
}

impl Default for RequirementSet {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[bon::bon]
impl RequirementSet {
    /// Without a `surface`, queue selection ignores presentation.
    #[builder]
    pub fn new(
        #[builder(default = vk::API_VERSION_1_3)] min_api_version: u32,
        surface: Option<vk::SurfaceKHR>,
        preferred: Option<AdapterId>,
    ) -> Self {
        Self {
            required_extensions: Vec::new(),
            optional_extensions: Vec::new(),
            required: CapabilityChain::new(),
            optional: CapabilityChain::new(),
            formats: Vec::new(),
            preferred,
            min_api_version,
            surface,
        }
    }

    /// Adding a name twice is a no-op.  Adding a name that is already optional is an error.
    pub fn require_extension(&mut self, name: &CStr) -> Result<(), SelectError> {
        if self.optional_extensions.iter().any(|e| e.as_c_str() == name) {
            return Err(SelectError::ExtensionConflict(name.to_owned()));
        }
        if !self.required_extensions.iter().any(|e| e.as_c_str() == name) {
            self.required_extensions.push(name.to_owned());
        }
        Ok(())
    }

    /// Adding a name twice is a no-op.  Adding a name that is already required is an error.
    pub fn request_extension(&mut self, name: &CStr) -> Result<(), SelectError> {
        if self.required_extensions.iter().any(|e| e.as_c_str() == name) {
            return Err(SelectError::ExtensionConflict(name.to_owned()));
        }
        if !self.optional_extensions.iter().any(|e| e.as_c_str() == name) {
            self.optional_extensions.push(name.to_owned());
        }
        Ok(())
    }

    /// Reset both chains to exactly `ids`, in order.
    pub fn init_blocks(&mut self, ids: &[vk::StructureType]) {
        self.required.reset();
        self.optional.reset();
        for id in ids {
            self.required.ensure_block(*id);
            self.optional.ensure_block(*id);
        }
    }

    /// Require flags of block `id`.  A block not named in [`Self::init_blocks`] is added to both
    /// chains so they stay the same shape.
    pub fn require_flags(&mut self, id: vk::StructureType, fields: &[usize]) {
        self.required.set_flags(id, fields);
        self.optional.ensure_block(id);
    }

    pub fn request_flags(&mut self, id: vk::StructureType, fields: &[usize]) {
        self.optional.set_flags(id, fields);
        self.required.ensure_block(id);
    }

    /// Repeated formats accumulate their flags.
    pub fn require_format(&mut self, format: vk::Format, flags: vk::FormatFeatureFlags2) {
        match self.formats.iter_mut().find(|(f, _)| *f == format) {
            Some((_, existing)) => *existing |= flags,
            None => self.formats.push((format, flags)),
        }
    }

    pub fn set_preferred(&mut self, id: Option<AdapterId>) {
        self.preferred = id;
    }

    pub fn set_surface(&mut self, surface: Option<vk::SurfaceKHR>) {
        self.surface = surface;
    }

    pub fn set_min_api_version(&mut self, version: u32) {
        self.min_api_version = version;
    }

    pub fn required_extensions(&self) -> &[CString] {
        &self.required_extensions
    }

    pub fn optional_extensions(&self) -> &[CString] {
        &self.optional_extensions
    }

    pub fn required(&self) -> &CapabilityChain {
        &self.required
    }

    pub fn optional(&self) -> &CapabilityChain {
        &self.optional
    }

    pub fn formats(&self) -> &[(vk::Format, vk::FormatFeatureFlags2)] {
        &self.formats
    }

    pub fn preferred(&self) -> Option<AdapterId> {
        self.preferred
    }

    pub fn min_api_version(&self) -> u32 {
        self.min_api_version
    }

    pub fn surface(&self) -> Option<vk::SurfaceKHR> {
        self.surface
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::registry::schema_for;

    const V12: vk::StructureType = vk::StructureType::PHYSICAL_DEVICE_VULKAN_1_2_FEATURES;
    const V13: vk::StructureType = vk::StructureType::PHYSICAL_DEVICE_VULKAN_1_3_FEATURES;

    #[test]
    fn test_extension_lists_are_exclusive() {
        let mut reqs = RequirementSet::default();
        reqs.require_extension(vk::KHR_SWAPCHAIN_NAME).unwrap();
        reqs.require_extension(vk::KHR_SWAPCHAIN_NAME).unwrap();
        reqs.request_extension(vk::EXT_MEMORY_BUDGET_NAME).unwrap();
        assert_eq!(reqs.required_extensions().len(), 1);

        assert!(matches!(
            reqs.request_extension(vk::KHR_SWAPCHAIN_NAME),
            Err(SelectError::ExtensionConflict(_))
        ));
        assert!(matches!(
            reqs.require_extension(vk::EXT_MEMORY_BUDGET_NAME),
            Err(SelectError::ExtensionConflict(_))
        ));
        assert_eq!(reqs.required_extensions(), &[vk::KHR_SWAPCHAIN_NAME.to_owned()]);
        assert_eq!(reqs.optional_extensions(), &[vk::EXT_MEMORY_BUDGET_NAME.to_owned()]);
    }

    #[test]
    fn test_chains_stay_in_lockstep() {
        let mut reqs = RequirementSet::builder()
            .min_api_version(vk::API_VERSION_1_2)
            .build();
        assert_eq!(reqs.min_api_version(), vk::API_VERSION_1_2);

        reqs.init_blocks(&[V13]);
        let timeline = schema_for(V12).field_index("timeline_semaphore").unwrap();
        reqs.request_flags(V12, &[timeline]);

        let required: Vec<_> = reqs.required().ids().collect();
        let optional: Vec<_> = reqs.optional().ids().collect();
        assert_eq!(required, vec![V13, V12]);
        assert_eq!(required, optional);
        assert_eq!(reqs.optional().flag(V12, timeline), Some(true));
        assert_eq!(reqs.required().flag(V12, timeline), Some(false));
    }

    #[test]
    fn test_formats_accumulate() {
        let mut reqs = RequirementSet::default();
        reqs.require_format(
            vk::Format::R8G8B8A8_UNORM,
            vk::FormatFeatureFlags2::SAMPLED_IMAGE,
        );
        reqs.require_format(
            vk::Format::R8G8B8A8_UNORM,
            vk::FormatFeatureFlags2::STORAGE_IMAGE,
        );
        assert_eq!(
            reqs.formats(),
            &[(
                vk::Format::R8G8B8A8_UNORM,
                vk::FormatFeatureFlags2::SAMPLED_IMAGE | vk::FormatFeatureFlags2::STORAGE_IMAGE
            )]
        );
    }
}
