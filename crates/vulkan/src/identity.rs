// Copyright 2026 The MuTate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Adapter Identity
//!
//! A 16 byte UUID that lets a user say "this GPU" across runs.  Drivers are supposed to report one.
//! Some report zeros, or half zeros.  Those get a synthetic identity instead:
//!
//! ```text
//! [vendor: 4 LE][enumeration index: 2 LE][0x80][0][0xF0][0][device: 4 LE][0; 2]
//! ```
//!
//! Byte 6 carries UUID version 8 (free form) and byte 8 the reserved variant `0xF`, which no real
//! UUID uses.  That marks it as ours.
//!
//! LIES the enumeration index is only stable as long as the loader enumerates in the same order.
//! Swap cards around and a stored preference quietly stops matching.

use std::{fmt, str::FromStr};

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AdapterId([u8; 16]);

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("adapter id must be 32 hex digits, optionally grouped 8-4-4-4-12: {0:?}")]
pub struct ParseAdapterIdError(String);

impl AdapterId {
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Use the reported UUID when it looks real, otherwise make one up.
    pub fn resolve(reported: [u8; 16], vendor_id: u32, device_id: u32, index: usize) -> Self {
        if Self::is_plausible(&reported) {
            Self(reported)
        } else {
            Self::synthesize(vendor_id, device_id, index)
        }
    }

    /// Drivers report all zeros, or zero one half.  Also reject versions no generator emits.
    pub fn is_plausible(bytes: &[u8; 16]) -> bool {
        let version = bytes[6] >> 4;
        (1..=8).contains(&version)
            && bytes[..6].iter().any(|b| *b != 0)
            && bytes[10..].iter().any(|b| *b != 0)
    }

    pub fn synthesize(vendor_id: u32, device_id: u32, index: usize) -> Self {
        // Nobody has 65536 GPUs.
        let index = index as u16;
        let mut bytes = [0u8; 16];
        bytes[..4].copy_from_slice(&vendor_id.to_le_bytes());
        bytes[4..6].copy_from_slice(&index.to_le_bytes());
        bytes[6] = 0x80;
        bytes[8] = 0xF0;
        bytes[10..14].copy_from_slice(&device_id.to_le_bytes());
        Self(bytes)
    }

    pub fn is_synthetic(&self) -> bool {
        self.0[6] & 0xF0 == 0x80 && self.0[8] & 0xF0 == 0xF0
    }
}

impl fmt::Display for AdapterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if matches!(i, 4 | 6 | 8 | 10) {
                f.write_str("-")?;
            }
            write!(f, "{b:02X}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for AdapterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AdapterId({self})")
    }
}

impl FromStr for AdapterId {
    type Err = ParseAdapterIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseAdapterIdError(s.to_owned());
        let digits: Vec<u8> = s.trim().bytes().filter(|b| *b != b'-').collect();
        // `from_str_radix` alone lets a leading `+` through.
        if digits.len() != 32 || !digits.iter().all(u8::is_ascii_hexdigit) {
            return Err(err());
        }
        let mut bytes = [0u8; 16];
        for (byte, pair) in bytes.iter_mut().zip(digits.chunks_exact(2)) {
            let pair = std::str::from_utf8(pair).map_err(|_| err())?;
            *byte = u8::from_str_radix(pair, 16).map_err(|_| err())?;
        }
        Ok(Self(bytes))
    }
}
