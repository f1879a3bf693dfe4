// Copyright 2026 The MuTate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Select
//!
//! Enumerate adapters once, put them in a sensible order, and create a device on the first one that
//! passes its probe.  Order is:
//!
//! 1. the preferred adapter, if the caller named one and it's plugged in
//! 2. discrete before everything else
//! 3. newer API first
//! 4. more device local memory first
//!
//! Ties keep enumeration order.
//!
//! Running out of candidates is fatal.  There's no degraded mode for a program that can't get a
//! device, so [`Selector::select_or_exit`] prints what happened and leaves.

use std::{
    cmp::Reverse,
    ffi::{c_char, CString},
    fmt,
};

use ash::vk;
use log::{error, info};

use crate::{
    chain::CapabilityChain,
    identity::AdapterId,
    probe::{self, Probe},
    queue::QueuePlan,
    requirements::RequirementSet,
    runtime::{AdapterProperties, Runtime},
    util::{self, ApiVersion},
};

#[derive(thiserror::Error, Debug)]
pub enum SelectError {
    #[error("Ash: {0}")]
    Ash(#[from] vk::Result),

    #[error("failed to load Vulkan: {0}")]
    Loading(#[from] ash::LoadingError),

    #[error("failed to get the list of GPU devices: {0}")]
    Enumerate(vk::Result),

    #[error("failed to get the list of GPU devices: list is empty")]
    NoAdapters,

    #[error("extension {0:?} cannot be both required and optional")]
    ExtensionConflict(CString),

    #[error("no candidate qualified ({tried} adapters tried)")]
    NoCandidate { tried: usize },

    #[error("device creation failed on {name}: {result}")]
    DeviceCreation { name: String, result: vk::Result },
}

/// One enumerated adapter with the snapshot used to rank it.
#[derive(Clone, Debug)]
pub struct Candidate {
    pub adapter: vk::PhysicalDevice,
    pub id: AdapterId,
    /// Enumeration order.
    pub index: usize,
    pub properties: AdapterProperties,
}

impl Candidate {
    pub fn is_discrete(&self) -> bool {
        self.properties.device_type == vk::PhysicalDeviceType::DISCRETE_GPU
    }
}

fn device_type_label(t: vk::PhysicalDeviceType) -> String {
    match t {
        vk::PhysicalDeviceType::OTHER => "Other".into(),
        vk::PhysicalDeviceType::INTEGRATED_GPU => "Integrated".into(),
        vk::PhysicalDeviceType::DISCRETE_GPU => "Discrete".into(),
        vk::PhysicalDeviceType::VIRTUAL_GPU => "Virtual".into(),
        vk::PhysicalDeviceType::CPU => "Software".into(),
        other => format!("UNKNOWN: {}", other.as_raw()),
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = &self.properties;
        write!(
            f,
            "({}) {} UUID: {} VRAM: {:.2} GiB VK: {} Driver: {} {}",
            device_type_label(p.device_type),
            p.name,
            self.id,
            util::gibibytes(p.device_local_memory),
            ApiVersion(p.api_version),
            p.driver_name,
            p.driver_info,
        )
    }
}

/// Put `preferred` first, then sort the rest.  Stable.
pub fn rank(candidates: &mut Vec<Candidate>, preferred: Option<AdapterId>) {
    let mut start = 0;
    if let Some(i) = preferred.and_then(|id| candidates.iter().position(|c| c.id == id)) {
        info!("putting preferred adapter {} at the top of the list", candidates[i].id);
        let c = candidates.remove(i);
        candidates.insert(0, c);
        start = 1;
    }
    candidates[start..].sort_by_key(|c| {
        (
            Reverse(c.is_discrete()),
            Reverse(c.properties.api_version),
            Reverse(c.properties.device_local_memory),
        )
    });
}

fn enumerate<R: Runtime + ?Sized>(runtime: &R) -> Result<Vec<Candidate>, SelectError> {
    let adapters = runtime
        .enumerate_adapters()
        .map_err(SelectError::Enumerate)?;
    if adapters.is_empty() {
        return Err(SelectError::NoAdapters);
    }
    Ok(adapters
        .into_iter()
        .enumerate()
        .map(|(index, adapter)| {
            let properties = runtime.properties(adapter);
            let id = AdapterId::resolve(
                properties.device_uuid,
                properties.vendor_id,
                properties.device_id,
                index,
            );
            Candidate {
                adapter,
                id,
                index,
                properties,
            }
        })
        .collect())
}

/// Resolve a stored identity back to an adapter, if it's still around.
pub fn find_adapter<R: Runtime + ?Sized>(
    runtime: &R,
    id: AdapterId,
) -> Result<Option<vk::PhysicalDevice>, SelectError> {
    Ok(enumerate(runtime)?
        .into_iter()
        .find(|c| c.id == id)
        .map(|c| c.adapter))
}

/// The outcome of a successful selection.  Owns the device and the enabled feature chain.
pub struct SelectedDevice<D> {
    pub device: D,
    pub adapter: vk::PhysicalDevice,
    pub id: AdapterId,
    pub probe: Probe,
}

impl<D> SelectedDevice<D> {
    pub fn enabled_extensions(&self) -> &[CString] {
        &self.probe.extensions
    }

    pub fn enabled_features(&self) -> &CapabilityChain {
        &self.probe.features
    }

    pub fn queue_plan(&self) -> &QueuePlan {
        &self.probe.queues
    }

    pub fn properties(&self) -> &probe::DeviceProperties {
        &self.probe.properties
    }
}

pub struct Selector<'a, R: Runtime + ?Sized> {
    runtime: &'a R,
    reqs: &'a RequirementSet,
}

impl<'a, R: Runtime + ?Sized> Selector<'a, R> {
    pub fn new(runtime: &'a R, reqs: &'a RequirementSet) -> Self {
        Self { runtime, reqs }
    }

    /// Every adapter in the order selection would try them.
    pub fn candidates(&self) -> Result<Vec<Candidate>, SelectError> {
        let mut candidates = enumerate(self.runtime)?;
        rank(&mut candidates, self.reqs.preferred());
        let mut listing = String::from("detected devices:");
        for (i, c) in candidates.iter().enumerate() {
            listing.push_str(&format!("\n[{i}] {c}"));
        }
        info!("{listing}");
        Ok(candidates)
    }

    pub fn select(&self) -> Result<SelectedDevice<R::Device>, SelectError> {
        let candidates = self.candidates()?;
        for (i, candidate) in candidates.iter().enumerate() {
            info!("trying device [{i}] {}", candidate.properties.name);
            let mut probe = match probe::probe(
                self.runtime,
                candidate.adapter,
                &candidate.properties,
                self.reqs,
            ) {
                Ok(probe) => probe,
                Err(reason) => {
                    info!("device [{i}] checks failed: {reason}");
                    continue;
                }
            };
            info!("device [{i}] checks passed");

            let device = create_device(self.runtime, candidate, &mut probe)?;
            info!("enabled extensions: {:?}", probe.extensions);
            info!("enabled features: {}", probe.features);
            return Ok(SelectedDevice {
                device,
                adapter: candidate.adapter,
                id: candidate.id,
                probe,
            });
        }
        Err(SelectError::NoCandidate {
            tried: candidates.len(),
        })
    }

    /// [`Self::select`], or exit the process with a diagnostic.
    pub fn select_or_exit(&self) -> SelectedDevice<R::Device> {
        self.select().unwrap_or_else(|e| fatal(&e))
    }
}

fn create_device<R: Runtime + ?Sized>(
    runtime: &R,
    candidate: &Candidate,
    probe: &mut Probe,
) -> Result<R::Device, SelectError> {
    let queue_infos = probe.queues.create_infos();
    let extensions: Vec<*const c_char> = probe.extensions.iter().map(|e| e.as_ptr()).collect();

    let result = probe.features.with_features2(|features2| {
        let info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_infos)
            .enabled_extension_names(&extensions)
            .push_next(features2);
        // SAFETY everything `info` points at outlives this call.
        unsafe { runtime.create_device(candidate.adapter, &info) }
    });

    result.map_err(|result| SelectError::DeviceCreation {
        name: candidate.properties.name.clone(),
        result,
    })
}

/// Report a selection failure and exit.  There is nothing to fall back to.
pub fn fatal(err: &SelectError) -> ! {
    error!("{err}");
    eprintln!("Unable to set up a Vulkan device: {err}");
    std::process::exit(1)
}

#[cfg(test)]
mod test {
    use ash::vk::Handle;

    use super::*;

    fn candidate(
        index: usize,
        device_type: vk::PhysicalDeviceType,
        api_version: u32,
        vram: u64,
    ) -> Candidate {
        Candidate {
            adapter: vk::PhysicalDevice::from_raw(index as u64 + 1),
            id: AdapterId::synthesize(0x1002, 0x1000 + index as u32, index),
            index,
            properties: AdapterProperties {
                device_type,
                api_version,
                device_local_memory: vram,
                ..Default::default()
            },
        }
    }

    fn order(candidates: &[Candidate]) -> Vec<usize> {
        candidates.iter().map(|c| c.index).collect()
    }

    #[test]
    fn test_rank_prefers_discrete_then_api_then_memory() {
        use vk::PhysicalDeviceType as T;
        let mut list = vec![
            candidate(0, T::INTEGRATED_GPU, vk::API_VERSION_1_3, 0),
            candidate(1, T::DISCRETE_GPU, vk::API_VERSION_1_2, 8 << 30),
            candidate(2, T::DISCRETE_GPU, vk::API_VERSION_1_3, 4 << 30),
            candidate(3, T::DISCRETE_GPU, vk::API_VERSION_1_3, 16 << 30),
            candidate(4, T::CPU, vk::API_VERSION_1_3, 0),
        ];
        rank(&mut list, None);
        assert_eq!(order(&list), vec![3, 2, 1, 0, 4]);
    }

    #[test]
    fn test_rank_is_stable() {
        use vk::PhysicalDeviceType as T;
        let mut list: Vec<_> = (0..6)
            .map(|i| candidate(i, T::INTEGRATED_GPU, vk::API_VERSION_1_3, 1 << 30))
            .collect();
        rank(&mut list, None);
        assert_eq!(order(&list), vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_rank_preferred_first() {
        use vk::PhysicalDeviceType as T;
        let mut list = vec![
            candidate(0, T::DISCRETE_GPU, vk::API_VERSION_1_3, 8 << 30),
            candidate(1, T::INTEGRATED_GPU, vk::API_VERSION_1_3, 0),
            candidate(2, T::DISCRETE_GPU, vk::API_VERSION_1_3, 4 << 30),
        ];
        let preferred = list[1].id;
        rank(&mut list, Some(preferred));
        assert_eq!(order(&list), vec![1, 0, 2]);

        // A preference for something unplugged changes nothing.
        let mut list = vec![
            candidate(0, T::INTEGRATED_GPU, vk::API_VERSION_1_3, 0),
            candidate(1, T::DISCRETE_GPU, vk::API_VERSION_1_3, 0),
        ];
        rank(&mut list, Some(AdapterId::from_bytes([7; 16])));
        assert_eq!(order(&list), vec![1, 0]);
    }

    #[test]
    fn test_candidate_display() {
        let mut c = candidate(0, vk::PhysicalDeviceType::DISCRETE_GPU, vk::API_VERSION_1_3, 8 << 30);
        c.properties.name = "Radeon".into();
        c.properties.driver_name = "radv".into();
        c.properties.driver_info = "Mesa".into();
        let shown = c.to_string();
        assert!(shown.starts_with("(Discrete) Radeon UUID: "));
        assert!(shown.ends_with("VRAM: 8.00 GiB VK: 1.3.0 Driver: radv Mesa"));
    }
}
