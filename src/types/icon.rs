// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device status icon types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse visual state of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    /// Device is on / active.
    On,
    /// Device is off / idle.
    Off,
    /// Device reported an error or is unreachable.
    Error,
    /// State is not known yet.
    #[default]
    Unknown,
}

impl DeviceStatus {
    /// Returns the lowercase name used in icon file names.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<bool> for DeviceStatus {
    fn from(value: bool) -> Self {
        if value { Self::On } else { Self::Off }
    }
}

/// What the UI should draw for a device tile.
///
/// # Examples
///
/// ```
/// use devtype_lib::types::{DeviceStatus, IconDescriptor};
///
/// let icon = IconDescriptor::for_status("bulb", DeviceStatus::On);
/// assert_eq!(icon.image(), "bulb_on.png");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconDescriptor {
    image: String,
    status: DeviceStatus,
}

impl IconDescriptor {
    /// Creates a descriptor from an explicit image name.
    #[must_use]
    pub fn new(image: impl Into<String>, status: DeviceStatus) -> Self {
        Self {
            image: image.into(),
            status,
        }
    }

    /// Creates a descriptor named `<base>_<status>.png`.
    #[must_use]
    pub fn for_status(base: &str, status: DeviceStatus) -> Self {
        Self::new(format!("{base}_{status}.png"), status)
    }

    /// Returns the image name.
    #[must_use]
    pub fn image(&self) -> &str {
        &self.image
    }

    /// Returns the status shown by the icon.
    #[must_use]
    pub fn status(&self) -> DeviceStatus {
        self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_from_bool() {
        assert_eq!(DeviceStatus::from(true), DeviceStatus::On);
        assert_eq!(DeviceStatus::from(false), DeviceStatus::Off);
    }

    #[test]
    fn for_status_builds_image_name() {
        let icon = IconDescriptor::for_status("lock", DeviceStatus::Error);
        assert_eq!(icon.image(), "lock_error.png");
        assert_eq!(icon.status(), DeviceStatus::Error);
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&DeviceStatus::Unknown).unwrap();
        assert_eq!(json, "\"unknown\"");
    }
}
