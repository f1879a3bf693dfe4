// Copyright 2026 The MuTate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Device Config
//!
//! Requirements can live in a TOML file instead of code:
//!
//! ```toml
//! min_api = "1.3"
//! preferred = "01234567-89AB-CDEF-0123-456789ABCDEF"
//! required_extensions = ["VK_KHR_swapchain"]
//! optional_extensions = ["VK_EXT_memory_budget"]
//!
//! [required_features]
//! Vulkan12 = ["timeline_semaphore"]
//!
//! [optional_features]
//! Core = ["wide_lines"]
//!
//! [[formats]]
//! format = "R8G8B8A8_UNORM"
//! features = ["SAMPLED_IMAGE", "STORAGE_IMAGE"]
//! ```
//!
//! Blocks are named by their short name (`Vulkan12`) or C name (`VkPhysicalDeviceVulkan12Features`).
//! Flags, formats and format features use the ash spelling.
//!
//! ## Precedence Rules
//!
//! 1. An explicit path, usually from the command line.
//! 2. `MUTATE_DEVICE_CONFIG`
//! 3. `device.toml` in the user's config directory under `mutate/`
//! 4. Built-in defaults.

use std::{
    ffi::CString,
    fs,
    path::{Path, PathBuf},
};

use ash::vk;
use log::{info, warn};
use toml::{Table, Value};

use crate::{
    identity::{AdapterId, ParseAdapterIdError},
    registry::{schema_by_name, BlockSchema},
    requirements::RequirementSet,
    select::SelectError,
    util::ApiVersion,
};

pub const CONFIG_ENV: &str = "MUTATE_DEVICE_CONFIG";

/// What we ask for when nobody says otherwise.  Optional, so any 1.3 device qualifies.
const BUILTIN: &str = r#"
min_api = "1.3"
optional_extensions = ["VK_EXT_memory_budget"]

[optional_features]
Vulkan12 = ["timeline_semaphore", "buffer_device_address"]
Vulkan13 = ["synchronization2", "dynamic_rendering"]
"#;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("read failed: {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parse failed: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("{key}: expected {expected}")]
    Type { key: String, expected: &'static str },
    #[error("unknown feature block {0:?}")]
    UnknownBlock(String),
    #[error("{block} has no flag {field:?}")]
    UnknownField { block: &'static str, field: String },
    #[error("unknown format {0:?}")]
    UnknownFormat(String),
    #[error("unknown format feature {0:?}")]
    UnknownFormatFeature(String),
    #[error("invalid API version {0:?}")]
    ApiVersion(String),
    #[error("invalid extension name {0:?}")]
    ExtensionName(String),
    #[error(transparent)]
    AdapterId(#[from] ParseAdapterIdError),
    #[error(transparent)]
    Requirements(#[from] SelectError),
}

/// Flags of one block, by schema index.
pub type FeatureList = Vec<(&'static BlockSchema, Vec<usize>)>;

#[derive(Debug, Default)]
pub struct DeviceConfig {
    pub min_api: Option<ApiVersion>,
    pub preferred: Option<AdapterId>,
    pub required_extensions: Vec<CString>,
    pub optional_extensions: Vec<CString>,
    pub required_features: FeatureList,
    pub optional_features: FeatureList,
    pub formats: Vec<(vk::Format, vk::FormatFeatureFlags2)>,
}

/// Where the config would be read from, if anywhere.
pub fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_owned());
    }
    if let Some(raw) = std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(raw));
    }
    dirs::config_dir()
        .map(|d| d.join("mutate").join("device.toml"))
        .filter(|p| p.is_file())
}

/// Follow the precedence rules.  Falls back to the built-in defaults.
pub fn load(explicit: Option<&Path>) -> Result<DeviceConfig, ConfigError> {
    match config_path(explicit) {
        Some(path) => {
            info!("reading device config {}", path.display());
            DeviceConfig::read(&path)
        }
        None => DeviceConfig::builtin(),
    }
}

impl DeviceConfig {
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::parse(BUILTIN)
    }

    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let table: Table = toml::from_str(text)?;
        let mut config = DeviceConfig::default();

        for (key, value) in &table {
            match key.as_str() {
                "min_api" => {
                    let s = as_str(key, value)?;
                    config.min_api =
                        Some(ApiVersion::parse(s).ok_or_else(|| ConfigError::ApiVersion(s.into()))?);
                }
                "preferred" => config.preferred = Some(as_str(key, value)?.parse()?),
                "required_extensions" => config.required_extensions = extensions(key, value)?,
                "optional_extensions" => config.optional_extensions = extensions(key, value)?,
                "required_features" => config.required_features = features(key, value)?,
                "optional_features" => config.optional_features = features(key, value)?,
                "formats" => config.formats = formats(key, value)?,
                other => warn!("ignoring unknown device config key {other:?}"),
            }
        }
        Ok(config)
    }

    /// Build requirements.  Blocks introduced by an extension that isn't core at `min_api` pull
    /// that extension in: required for required blocks, optional otherwise.
    pub fn requirements(&self) -> Result<RequirementSet, ConfigError> {
        let min_api = self.min_api.map_or(vk::API_VERSION_1_3, |v| v.0);
        let mut reqs = RequirementSet::builder()
            .min_api_version(min_api)
            .maybe_preferred(self.preferred)
            .build();

        for name in &self.required_extensions {
            reqs.require_extension(name)?;
        }
        for name in &self.optional_extensions {
            reqs.request_extension(name)?;
        }

        let mut ids = Vec::new();
        for (schema, _) in self.required_features.iter().chain(&self.optional_features) {
            if schema.chained && !ids.contains(&schema.id) {
                ids.push(schema.id);
            }
        }
        reqs.init_blocks(&ids);

        for (schema, fields) in &self.required_features {
            reqs.require_flags(schema.id, fields);
            if let Some(ext) = schema.required_extension(min_api)
                && !reqs.optional_extensions().iter().any(|e| e.as_c_str() == ext)
            {
                reqs.require_extension(ext)?;
            }
        }
        for (schema, fields) in &self.optional_features {
            reqs.request_flags(schema.id, fields);
            if let Some(ext) = schema.required_extension(min_api)
                && !reqs.required_extensions().iter().any(|e| e.as_c_str() == ext)
            {
                reqs.request_extension(ext)?;
            }
        }

        for &(format, flags) in &self.formats {
            reqs.require_format(format, flags);
        }
        Ok(reqs)
    }
}

fn as_str<'a>(key: &str, value: &'a Value) -> Result<&'a str, ConfigError> {
    value.as_str().ok_or_else(|| ConfigError::Type {
        key: key.into(),
        expected: "a string",
    })
}

fn strings<'a>(key: &str, value: &'a Value) -> Result<Vec<&'a str>, ConfigError> {
    let expected = || ConfigError::Type {
        key: key.into(),
        expected: "an array of strings",
    };
    value
        .as_array()
        .ok_or_else(expected)?
        .iter()
        .map(|v| v.as_str().ok_or_else(expected))
        .collect()
}

fn extensions(key: &str, value: &Value) -> Result<Vec<CString>, ConfigError> {
    strings(key, value)?
        .into_iter()
        .map(|s| CString::new(s).map_err(|_| ConfigError::ExtensionName(s.into())))
        .collect()
}

fn features(key: &str, value: &Value) -> Result<FeatureList, ConfigError> {
    let table = value.as_table().ok_or_else(|| ConfigError::Type {
        key: key.into(),
        expected: "a table of block names",
    })?;
    table
        .iter()
        .map(|(block, flags)| {
            let schema =
                schema_by_name(block).ok_or_else(|| ConfigError::UnknownBlock(block.clone()))?;
            let fields = strings(&format!("{key}.{block}"), flags)?
                .into_iter()
                .map(|field| {
                    schema
                        .field_index(field)
                        .filter(|i| schema.is_flag(*i))
                        .ok_or_else(|| ConfigError::UnknownField {
                            block: schema.name,
                            field: field.into(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok((schema, fields))
        })
        .collect()
}

fn formats(
    key: &str,
    value: &Value,
) -> Result<Vec<(vk::Format, vk::FormatFeatureFlags2)>, ConfigError> {
    let expected = |expected| ConfigError::Type {
        key: key.into(),
        expected,
    };
    value
        .as_array()
        .ok_or_else(|| expected("an array of tables"))?
        .iter()
        .map(|entry| {
            let entry = entry
                .as_table()
                .ok_or_else(|| expected("an array of tables"))?;
            let name = entry
                .get("format")
                .and_then(Value::as_str)
                .ok_or_else(|| expected("a format name in every entry"))?;
            let format = format_by_name(name).ok_or_else(|| ConfigError::UnknownFormat(name.into()))?;
            let flags = match entry.get("features") {
                Some(v) => strings(&format!("{key}.features"), v)?
                    .into_iter()
                    .try_fold(vk::FormatFeatureFlags2::empty(), |acc, f| {
                        format_feature_by_name(f)
                            .map(|bit| acc | bit)
                            .ok_or_else(|| ConfigError::UnknownFormatFeature(f.into()))
                    })?,
                None => vk::FormatFeatureFlags2::empty(),
            };
            Ok((format, flags))
        })
        .collect()
}

/// Core formats, then the extension ranges that still matter.
const FORMAT_RANGES: &[(i32, i32)] = &[
    (0, 184),
    (1_000_054_000, 1_000_054_007),
    (1_000_066_000, 1_000_066_013),
    (1_000_156_000, 1_000_156_033),
    (1_000_330_000, 1_000_330_003),
    (1_000_340_000, 1_000_340_001),
    (1_000_470_000, 1_000_470_001),
];

/// `R8G8B8A8_UNORM` to `vk::Format::R8G8B8A8_UNORM`.  Leans on ash's `Debug` names.
pub fn format_by_name(name: &str) -> Option<vk::Format> {
    FORMAT_RANGES
        .iter()
        .flat_map(|&(lo, hi)| lo..=hi)
        .map(vk::Format::from_raw)
        .find(|f| format!("{f:?}") == name)
}

/// `SAMPLED_IMAGE` to the matching single bit of `vk::FormatFeatureFlags2`.
pub fn format_feature_by_name(name: &str) -> Option<vk::FormatFeatureFlags2> {
    (0..64)
        .map(|bit| vk::FormatFeatureFlags2::from_raw(1u64 << bit))
        .find(|f| format!("{f:?}") == name)
}
