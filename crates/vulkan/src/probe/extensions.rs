// Copyright 2026 The MuTate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::{
    collections::HashSet,
    ffi::{CStr, CString},
};

use log::{debug, warn};

use super::Disqualification;
use crate::requirements::RequirementSet;

/// Required names in declaration order, then the optional names the device has.
pub(super) fn check(
    available: &[CString],
    reqs: &RequirementSet,
) -> Result<Vec<CString>, Disqualification> {
    let available: HashSet<&CStr> = available.iter().map(CString::as_c_str).collect();

    if let Some(missing) = reqs
        .required_extensions()
        .iter()
        .find(|name| !available.contains(name.as_c_str()))
    {
        return Err(Disqualification::MissingExtension(
            missing.to_string_lossy().into_owned(),
        ));
    }

    let mut enabled = reqs.required_extensions().to_vec();
    for name in reqs.optional_extensions() {
        if available.contains(name.as_c_str()) {
            debug!("found optional extension {name:?}");
            enabled.push(name.clone());
        } else {
            warn!("optional extension {name:?} not available");
        }
    }
    Ok(enabled)
}
