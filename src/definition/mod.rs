// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The capability contract implemented by device type plugins.
//!
//! A skill provides one [`DeviceTypeDefinition`] per device category it
//! handles (light, lock, sensor, ...). The definition carries a
//! [`DeviceTypeDeclaration`] (identity, schemas, limits) and the behavior
//! hooks:
//!
//! | Hook                   | Mandatory | Default when not provided      |
//! |------------------------|-----------|--------------------------------|
//! | `discover`             | yes       | `Unimplemented`                |
//! | `status_icon`          | yes       | `Unimplemented`                |
//! | `toggle`               | yes       | `Unimplemented`                |
//! | `on_rename`            | no        | accepts the rename             |
//! | `on_changed_location`  | no        | does nothing                   |
//! | `device_config`        | no        | no configuration               |
//!
//! Mandatory hooks are additionally gated by the [`Capabilities`] the
//! definition reports, and every hook call goes through a boundary that turns
//! panics into [`CapabilityError::Panicked`].
//!
//! # Examples
//!
//! ```
//! use devtype_lib::definition::{DeviceTypeDeclaration, DeviceTypeDefinition, TelemetryView};
//! use devtype_lib::device::Device;
//! use devtype_lib::error::CapabilityError;
//! use devtype_lib::schema::SettingsSchema;
//! use devtype_lib::types::{DeviceStatus, IconDescriptor};
//! use devtype_lib::Capabilities;
//!
//! struct MotionSensor {
//!     declaration: DeviceTypeDeclaration,
//! }
//!
//! impl DeviceTypeDefinition for MotionSensor {
//!     fn declaration(&self) -> &DeviceTypeDeclaration {
//!         &self.declaration
//!     }
//!
//!     fn capabilities(&self) -> Capabilities {
//!         Capabilities::builder().with_status_icon().build()
//!     }
//!
//!     fn status_icon(
//!         &self,
//!         _device: &Device,
//!         telemetry: &TelemetryView<'_>,
//!     ) -> Result<IconDescriptor, CapabilityError> {
//!         let motion = telemetry
//!             .reading()
//!             .and_then(|r| r.get("motion").and_then(serde_json::Value::as_bool));
//!         let status = motion.map_or(DeviceStatus::Unknown, DeviceStatus::from);
//!         Ok(IconDescriptor::for_status("motion", status))
//!     }
//! }
//!
//! let sensor = MotionSensor {
//!     declaration: DeviceTypeDeclaration::new("Security", "MotionSensor")
//!         .with_device_schema(SettingsSchema::builder().setting("sensitivity", 3).build()),
//! };
//! assert_eq!(sensor.declaration().name(), "MotionSensor");
//! ```

mod boundary;
mod declaration;

pub use declaration::DeviceTypeDeclaration;

pub(crate) use boundary::{guarded, require};

use std::sync::Arc;

use serde_json::Value;

use crate::Capabilities;
use crate::capabilities::Capability;
use crate::device::Device;
use crate::error::CapabilityError;
use crate::pairing::PairingCompletion;
use crate::types::{IconDescriptor, SessionToken};

/// The skill (plugin instance) owning a device type.
pub trait Skill: Send + Sync {
    /// Returns the skill name stamped on devices it handles.
    fn name(&self) -> &str;
}

/// Read-only telemetry collaborator.
pub trait Telemetry: Send + Sync {
    /// Returns the latest structured reading reported for `site_id`.
    fn data_for_site(&self, site_id: &str) -> Option<Value>;
}

/// Telemetry access scoped to one device, handed to `status_icon`.
#[derive(Clone, Copy)]
pub struct TelemetryView<'a> {
    source: Option<&'a dyn Telemetry>,
    site_id: &'a str,
}

impl<'a> TelemetryView<'a> {
    /// Creates a view on `source` for the given site.
    #[must_use]
    pub fn new(source: Option<&'a dyn Telemetry>, site_id: &'a str) -> Self {
        Self { source, site_id }
    }

    /// Creates a view without any telemetry source.
    #[must_use]
    pub fn none(site_id: &'a str) -> Self {
        Self::new(None, site_id)
    }

    /// Returns the site the view is scoped to.
    #[must_use]
    pub fn site_id(&self) -> &str {
        self.site_id
    }

    /// Returns the latest reading for the device's site, if any.
    #[must_use]
    pub fn reading(&self) -> Option<Value> {
        self.source.and_then(|t| t.data_for_site(self.site_id))
    }
}

impl std::fmt::Debug for TelemetryView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryView")
            .field("site_id", &self.site_id)
            .field("has_source", &self.source.is_some())
            .finish()
    }
}

/// A pairing attempt handed to [`DeviceTypeDefinition::discover`].
///
/// The plugin keeps `completion` and reports the result through it once the
/// physical unit answers, from any thread or task.
#[derive(Debug)]
pub struct DiscoveryRequest {
    /// The device record waiting for a physical identifier.
    pub device: Arc<Device>,
    /// Identifier of the physical unit being paired, if already known.
    pub physical_id: String,
    /// Site that should receive spoken feedback.
    pub reply_site_id: String,
    /// Dialogue session to correlate feedback with, if any.
    pub session: Option<SessionToken>,
    /// Completion handle for this attempt.
    pub completion: PairingCompletion,
}

/// Behavior contract of a plugin-supplied device type.
///
/// Mandatory hooks default to [`CapabilityError::Unimplemented`]; a plugin
/// must both override them and report them in
/// [`capabilities`](Self::capabilities).
pub trait DeviceTypeDefinition: Send + Sync {
    /// Returns the identity, schemas and limits of the type.
    fn declaration(&self) -> &DeviceTypeDeclaration;

    /// Returns which mandatory hooks are implemented.
    fn capabilities(&self) -> Capabilities {
        Capabilities::none()
    }

    /// Starts or continues pairing a not-yet-identified physical unit.
    ///
    /// Returns `Ok(false)` if the plugin is busy with another pairing. On
    /// `Ok(true)` the plugin must eventually call
    /// [`PairingCompletion::paired`] or [`PairingCompletion::failed`]; the
    /// coordinator times the attempt out otherwise. Must not wait for the
    /// physical device before returning.
    ///
    /// # Errors
    ///
    /// Returns an error if discovery cannot be started.
    fn discover(&self, request: DiscoveryRequest) -> Result<bool, CapabilityError> {
        let _ = request;
        Err(CapabilityError::unimplemented(Capability::Discover.as_str()))
    }

    /// Resolves the icon showing the current state of `device`.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be resolved.
    fn status_icon(
        &self,
        device: &Device,
        telemetry: &TelemetryView<'_>,
    ) -> Result<IconDescriptor, CapabilityError> {
        let _ = (device, telemetry);
        Err(CapabilityError::unimplemented(Capability::StatusIcon.as_str()))
    }

    /// Executes the primary user action on `device`.
    ///
    /// # Errors
    ///
    /// Returns an error if the action failed.
    fn toggle(&self, device: &Device) -> Result<(), CapabilityError> {
        let _ = device;
        Err(CapabilityError::unimplemented(Capability::Toggle.as_str()))
    }

    /// Called before `device` is renamed; return `false` to refuse.
    ///
    /// # Errors
    ///
    /// Returns an error if the plugin failed to process the rename.
    fn on_rename(&self, device: &Device, new_name: &str) -> Result<bool, CapabilityError> {
        let _ = (device, new_name);
        Ok(true)
    }

    /// Called after `device` moved to another location.
    ///
    /// # Errors
    ///
    /// Returns an error if the plugin failed to react to the move.
    fn on_changed_location(&self, device: &Device) -> Result<(), CapabilityError> {
        let _ = device;
        Ok(())
    }

    /// Returns plugin-specific configuration for `device`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be produced.
    fn device_config(&self, device: &Device) -> Result<Option<Value>, CapabilityError> {
        let _ = device;
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DeviceId, DeviceTypeId};
    use serde_json::json;

    struct Bare {
        declaration: DeviceTypeDeclaration,
    }

    impl DeviceTypeDefinition for Bare {
        fn declaration(&self) -> &DeviceTypeDeclaration {
            &self.declaration
        }
    }

    struct FixedTelemetry;

    impl Telemetry for FixedTelemetry {
        fn data_for_site(&self, site_id: &str) -> Option<Value> {
            (site_id == "kitchen").then(|| json!({"power": "on"}))
        }
    }

    fn device() -> Device {
        Device::new(DeviceId::new(1), DeviceTypeId::new(1), "kitchen")
    }

    fn bare() -> Bare {
        Bare {
            declaration: DeviceTypeDeclaration::new("Skill", "Bare"),
        }
    }

    #[test]
    fn mandatory_defaults_are_unimplemented() {
        let bare = bare();
        let device = device();

        assert_eq!(bare.capabilities(), Capabilities::none());
        assert_eq!(
            bare.toggle(&device),
            Err(CapabilityError::unimplemented("toggle"))
        );
        assert_eq!(
            bare.status_icon(&device, &TelemetryView::none("kitchen")),
            Err(CapabilityError::unimplemented("statusIcon"))
        );
    }

    #[test]
    fn optional_defaults_are_safe() {
        let bare = bare();
        let device = device();

        assert_eq!(bare.on_rename(&device, "New name"), Ok(true));
        assert_eq!(bare.on_changed_location(&device), Ok(()));
        assert_eq!(bare.device_config(&device), Ok(None));
    }

    #[test]
    fn telemetry_view_reads_own_site() {
        let source = FixedTelemetry;
        let view = TelemetryView::new(Some(&source), "kitchen");
        assert_eq!(view.reading(), Some(json!({"power": "on"})));

        let elsewhere = TelemetryView::new(Some(&source), "garage");
        assert_eq!(elsewhere.reading(), None);
        assert_eq!(TelemetryView::none("kitchen").reading(), None);
    }
}
