// Copyright 2026 The MuTate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Vulkan
//!
//! The little engine that does or does not, but never tries (because it's unsafe).
//!
//! This crate picks a GPU and makes a device out of it.  Callers say what they need (extensions,
//! feature flags, format support) and what they'd like.  Every adapter is probed against that, the
//! best passing one wins, and the enabled set is exactly what was needed plus whatever optional
//! items the adapter had.
//!
//! Core types:
//!
//! - **Describing capabilities**
//!   * [`registry::BlockSchema`] one per `VkPhysicalDevice*Features` structure
//!   * [`chain::CapabilityChain`] the `pNext` chain, minus the pointers
//! - **Asking**
//!   * [`requirements::RequirementSet`]
//!   * [`config::DeviceConfig`] the same, from TOML
//! - **Answering**
//!   * [`probe::probe`] one adapter, five stages
//!   * [`select::Selector`] rank, probe, create
//!   * [`context::VkContext`] instance, device and queues
//!
//! The driver sits behind [`runtime::Runtime`] so that selection can be tested without one.

pub mod chain;
#[cfg(feature = "config")]
pub mod config;
pub mod context;
pub mod identity;
pub mod probe;
pub mod queue;
pub mod registry;
pub mod requirements;
pub mod runtime;
pub mod select;
pub mod util;

pub mod prelude {
    pub use crate::chain::CapabilityChain;
    pub use crate::context::{VkContext, VkInstance};
    pub use crate::identity::AdapterId;
    pub use crate::probe::{Disqualification, Probe};
    pub use crate::queue::{QueueRole, Queues};
    pub use crate::registry::{schema_by_name, schema_for, HEAD_BLOCK};
    pub use crate::requirements::RequirementSet;
    pub use crate::runtime::{InstanceRuntime, Runtime};
    pub use crate::select::{fatal, SelectError, SelectedDevice, Selector};
}
