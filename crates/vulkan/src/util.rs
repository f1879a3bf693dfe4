// Copyright 2026 The MuTate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Vulkan Utils
//!
//! Junk drawer.  Move things out when there is a place for them to belong.
//!

use std::fmt;

use ash::vk;

const GIB: f64 = (1u64 << 30) as f64;

/// Size of the largest heap behind a memory type that is device local and not host visible.
///
/// Integrated parts that only expose host visible device memory report zero.  That is the point,
/// it's a ranking tiebreaker for discrete memory.
pub fn device_local_memory(mem_props: &vk::PhysicalDeviceMemoryProperties) -> vk::DeviceSize {
    let count = (mem_props.memory_type_count as usize).min(mem_props.memory_types.len());
    mem_props.memory_types[..count]
        .iter()
        .filter(|t| {
            t.property_flags.contains(vk::MemoryPropertyFlags::DEVICE_LOCAL)
                && !t.property_flags.contains(vk::MemoryPropertyFlags::HOST_VISIBLE)
        })
        .filter_map(|t| mem_props.memory_heaps.get(t.heap_index as usize))
        .map(|heap| heap.size)
        .max()
        .unwrap_or(0)
}

pub fn gibibytes(bytes: vk::DeviceSize) -> f64 {
    bytes as f64 / GIB
}

/// Packed Vulkan version that prints as `major.minor.patch`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ApiVersion(pub u32);

impl ApiVersion {
    pub fn major(self) -> u32 {
        vk::api_version_major(self.0)
    }

    pub fn minor(self) -> u32 {
        vk::api_version_minor(self.0)
    }

    pub fn patch(self) -> u32 {
        vk::api_version_patch(self.0)
    }

    /// Parse `1.3` or `1.3.250`.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.trim().split('.').map(|p| p.parse::<u32>().ok());
        let major = parts.next()??;
        let minor = parts.next()??;
        let patch = match parts.next() {
            Some(p) => p?,
            None => 0,
        };
        if parts.next().is_some() || major > 0x7F || minor > 0x3FF || patch > 0xFFF {
            return None;
        }
        Some(Self(vk::make_api_version(0, major, minor, patch)))
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major(), self.minor(), self.patch())
    }
}
