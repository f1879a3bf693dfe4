// Copyright 2026 The MuTate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Probe
//!
//! Evaluate one adapter against a [`RequirementSet`].  Stages run in a fixed order and the first
//! failure ends the probe:
//!
//! 1. properties
//! 2. extensions
//! 3. features
//! 4. formats
//! 5. queues
//!
//! A failed probe only disqualifies that adapter.  Nothing is retried with relaxed requirements.

mod extensions;
mod features;
mod formats;
mod properties;

pub use features::{resolve, resolve_flag, FlagOutcome};
pub use formats::check_formats;
pub use properties::{
    BindingLimits, ComputeLimits, DescriptorLimits, DeviceProperties, GlobalLimits, Limits,
    PipelineLimits,
};

use std::ffi::CString;

use ash::vk;
use log::debug;

use crate::{
    chain::CapabilityChain,
    queue::{QueueError, QueuePlan},
    requirements::RequirementSet,
    runtime::{AdapterProperties, Runtime},
    util::ApiVersion,
};

/// Why an adapter was passed over.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Disqualification {
    #[error("device API {found} is below the required {required}")]
    ApiVersion {
        found: ApiVersion,
        required: ApiVersion,
    },

    #[error("extension query failed: {0}")]
    ExtensionQuery(vk::Result),

    #[error("missing required extension {0}")]
    MissingExtension(String),

    #[error("missing required feature {block}.{field}")]
    MissingFeature {
        block: &'static str,
        field: &'static str,
    },

    #[error("format {format:?} lacks optimal tiling features {missing:?}")]
    UnsupportedFormat {
        format: vk::Format,
        missing: vk::FormatFeatureFlags2,
    },

    #[error(transparent)]
    Queues(#[from] QueueError),
}

/// Everything needed to create a device on an adapter that passed.
#[derive(Clone, Debug)]
pub struct Probe {
    pub properties: DeviceProperties,
    pub extensions: Vec<CString>,
    pub features: CapabilityChain,
    pub queues: QueuePlan,
}

fn stage<T>(name: &str, result: Result<T, Disqualification>) -> Result<T, Disqualification> {
    match &result {
        Ok(_) => debug!("{name}: pass"),
        Err(e) => debug!("{name}: fail: {e}"),
    }
    result
}

/// Run every stage against `adapter`.  `props` is the snapshot the selector ranked with.
pub fn probe<R: Runtime + ?Sized>(
    runtime: &R,
    adapter: vk::PhysicalDevice,
    props: &AdapterProperties,
    reqs: &RequirementSet,
) -> Result<Probe, Disqualification> {
    let properties = stage(
        "properties",
        properties::check(props, reqs.min_api_version()),
    )?;

    let extensions = stage(
        "extensions",
        runtime
            .extensions(adapter)
            .map_err(Disqualification::ExtensionQuery)
            .and_then(|available| extensions::check(&available, reqs)),
    )?;

    let features = stage("features", features::check(runtime, adapter, reqs))?;
    debug!("enabled features: {features}");

    stage("formats", formats::check(runtime, adapter, reqs))?;

    let families = runtime.queue_families(adapter);
    let plan = match reqs.surface() {
        Some(surface) => QueuePlan::assign(&families, |family| {
            runtime.presentation_support(adapter, family, surface)
        }),
        None => QueuePlan::assign(&families, |_| Ok(true)),
    };
    let queues = stage("queues", plan.map_err(Disqualification::from))?;

    Ok(Probe {
        properties,
        extensions,
        features,
        queues,
    })
}
