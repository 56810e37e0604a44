// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Capability flags of a device type definition.
//!
//! A plugin declares which of the mandatory capabilities it implements.
//! The flags are checked at call time: calling a capability whose flag is
//! not set fails with
//! [`CapabilityError::Unimplemented`](crate::error::CapabilityError::Unimplemented)
//! without ever entering plugin code.
//!
//! Optional capabilities (rename, location change, device config) have safe
//! defaults and need no flag.

use std::fmt;

/// A mandatory capability of a device type definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Discovery / pairing of new physical units.
    Discover,
    /// Status icon resolution.
    StatusIcon,
    /// Primary user action.
    Toggle,
}

impl Capability {
    /// Every mandatory capability.
    pub const ALL: [Self; 3] = [Self::Discover, Self::StatusIcon, Self::Toggle];

    /// Returns the capability name used in errors and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Discover => "discover",
            Self::StatusIcon => "statusIcon",
            Self::Toggle => "toggle",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which mandatory capabilities a definition implements.
///
/// The default implements nothing, so a plugin that forgets to declare a
/// capability gets `Unimplemented` instead of silently running a stub.
///
/// # Examples
///
/// ```
/// use devtype_lib::{Capabilities, Capability};
///
/// let sensor = Capabilities::builder().with_status_icon().build();
/// assert!(sensor.supports(Capability::StatusIcon));
/// assert!(!sensor.supports(Capability::Toggle));
///
/// let light = Capabilities::all();
/// assert!(light.supports(Capability::Discover));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
// One flag per independent capability.
#[allow(clippy::struct_excessive_bools)]
pub struct Capabilities {
    /// Implements discovery / pairing.
    pub discover: bool,
    /// Implements status icon resolution.
    pub status_icon: bool,
    /// Implements the toggle action.
    pub toggle: bool,
}

impl Capabilities {
    /// No capability implemented.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            discover: false,
            status_icon: false,
            toggle: false,
        }
    }

    /// Every mandatory capability implemented.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            discover: true,
            status_icon: true,
            toggle: true,
        }
    }

    /// Returns a builder starting from [`none`](Self::none).
    #[must_use]
    pub fn builder() -> CapabilitiesBuilder {
        CapabilitiesBuilder::new()
    }

    /// Returns `true` if the capability is implemented.
    #[must_use]
    pub const fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::Discover => self.discover,
            Capability::StatusIcon => self.status_icon,
            Capability::Toggle => self.toggle,
        }
    }

    /// Returns the capabilities that are not implemented.
    #[must_use]
    pub fn missing(&self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|c| !self.supports(*c))
            .collect()
    }
}

/// Builder for [`Capabilities`].
#[derive(Debug, Default)]
pub struct CapabilitiesBuilder {
    inner: Capabilities,
}

impl CapabilitiesBuilder {
    /// Creates a builder with no capability enabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables discovery.
    #[must_use]
    pub fn with_discover(mut self) -> Self {
        self.inner.discover = true;
        self
    }

    /// Enables status icon resolution.
    #[must_use]
    pub fn with_status_icon(mut self) -> Self {
        self.inner.status_icon = true;
        self
    }

    /// Enables the toggle action.
    #[must_use]
    pub fn with_toggle(mut self) -> Self {
        self.inner.toggle = true;
        self
    }

    /// Builds the capabilities.
    #[must_use]
    pub fn build(self) -> Capabilities {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_implements_nothing() {
        let caps = Capabilities::default();
        assert_eq!(caps, Capabilities::none());
        assert_eq!(caps.missing(), Capability::ALL.to_vec());
    }

    #[test]
    fn all_implements_everything() {
        let caps = Capabilities::all();
        assert!(Capability::ALL.iter().all(|c| caps.supports(*c)));
        assert!(caps.missing().is_empty());
    }

    #[test]
    fn builder_pattern() {
        let caps = CapabilitiesBuilder::new().with_discover().with_toggle().build();

        assert!(caps.discover);
        assert!(caps.toggle);
        assert!(!caps.status_icon);
        assert_eq!(caps.missing(), vec![Capability::StatusIcon]);
    }

    #[test]
    fn capability_names() {
        assert_eq!(Capability::Discover.to_string(), "discover");
        assert_eq!(Capability::StatusIcon.as_str(), "statusIcon");
    }
}
