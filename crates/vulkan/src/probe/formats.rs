// Copyright 2026 The MuTate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use ash::vk;

use super::Disqualification;
use crate::{requirements::RequirementSet, runtime::Runtime};

/// Check `formats` in order against what `supported` reports.  The first format lacking any
/// requested flag is the one reported, with only the flags it lacks.
pub fn check_formats(
    formats: &[(vk::Format, vk::FormatFeatureFlags2)],
    mut supported: impl FnMut(vk::Format) -> vk::FormatFeatureFlags2,
) -> Result<(), Disqualification> {
    for &(format, flags) in formats {
        let supported = supported(format);
        if !supported.contains(flags) {
            return Err(Disqualification::UnsupportedFormat {
                format,
                missing: flags & !supported,
            });
        }
    }
    Ok(())
}

/// Optimal tiling must support every requested flag.
pub(super) fn check<R: Runtime + ?Sized>(
    runtime: &R,
    adapter: vk::PhysicalDevice,
    reqs: &RequirementSet,
) -> Result<(), Disqualification> {
    check_formats(reqs.formats(), |format| {
        runtime.format_features(adapter, format)
    })
}

#[cfg(test)]
mod test {
    use super::*;

    type F2 = vk::FormatFeatureFlags2;

    fn device(format: vk::Format) -> F2 {
        match format {
            vk::Format::R8G8B8A8_UNORM => F2::SAMPLED_IMAGE | F2::COLOR_ATTACHMENT,
            vk::Format::R16G16B16A16_SFLOAT => F2::SAMPLED_IMAGE,
            vk::Format::D32_SFLOAT => F2::DEPTH_STENCIL_ATTACHMENT,
            _ => F2::empty(),
        }
    }

    #[test]
    fn test_missing_is_only_the_unsupported_part() {
        let formats = [(
            vk::Format::R16G16B16A16_SFLOAT,
            F2::SAMPLED_IMAGE | F2::STORAGE_IMAGE,
        )];
        assert_eq!(
            check_formats(&formats, device).unwrap_err(),
            Disqualification::UnsupportedFormat {
                format: vk::Format::R16G16B16A16_SFLOAT,
                missing: F2::STORAGE_IMAGE,
            }
        );
    }

    #[test]
    fn test_first_failing_format_reported() {
        let formats = [
            (vk::Format::R8G8B8A8_UNORM, F2::SAMPLED_IMAGE),
            (vk::Format::D32_SFLOAT, F2::SAMPLED_IMAGE),
            (vk::Format::R16G16B16A16_SFLOAT, F2::STORAGE_IMAGE),
        ];
        let mut asked = Vec::new();
        let err = check_formats(&formats, |f| {
            asked.push(f);
            device(f)
        })
        .unwrap_err();
        assert_eq!(
            err,
            Disqualification::UnsupportedFormat {
                format: vk::Format::D32_SFLOAT,
                missing: F2::SAMPLED_IMAGE,
            }
        );
        // Stops at the first failure.
        assert_eq!(asked, vec![vk::Format::R8G8B8A8_UNORM, vk::Format::D32_SFLOAT]);
    }

    #[test]
    fn test_superset_passes() {
        let formats = [
            (vk::Format::R8G8B8A8_UNORM, F2::SAMPLED_IMAGE),
            (vk::Format::D32_SFLOAT, F2::DEPTH_STENCIL_ATTACHMENT),
            (vk::Format::B8G8R8A8_SRGB, F2::empty()),
        ];
        assert!(check_formats(&formats, device).is_ok());
        assert!(check_formats(&[], device).is_ok());
    }
}
