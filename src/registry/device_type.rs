// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A registered device type: persisted record plus plugin behavior.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde_json::Value;

use crate::Capabilities;
use crate::capabilities::Capability;
use crate::definition::{DeviceTypeDefinition, Skill, Telemetry, TelemetryView, guarded, require};
use crate::device::{Device, DeviceRegistry};
use crate::error::{CapabilityError, Error, Result};
use crate::record::DeviceTypeRecord;
use crate::schema::SettingsValues;
use crate::types::{DeviceTypeId, IconDescriptor, LocationId};

/// A device type bound to its plugin definition.
///
/// Every capability call goes through the contract boundary: undeclared
/// mandatory capabilities fail with `Unimplemented` before plugin code runs,
/// and plugin failures or panics come back as [`Error::Capability`].
pub struct DeviceType {
    record: DeviceTypeRecord,
    definition: Arc<dyn DeviceTypeDefinition>,
    skill: RwLock<Option<Weak<dyn Skill>>>,
    devices: Arc<dyn DeviceRegistry>,
    telemetry: Option<Arc<dyn Telemetry>>,
}

impl DeviceType {
    pub(crate) fn new(
        record: DeviceTypeRecord,
        definition: Arc<dyn DeviceTypeDefinition>,
        devices: Arc<dyn DeviceRegistry>,
        telemetry: Option<Arc<dyn Telemetry>>,
    ) -> Self {
        Self {
            record,
            definition,
            skill: RwLock::new(None),
            devices,
            telemetry,
        }
    }

    /// Returns the persisted id.
    #[must_use]
    pub fn id(&self) -> DeviceTypeId {
        self.record.id()
    }

    /// Returns the owning skill name.
    #[must_use]
    pub fn skill_name(&self) -> &str {
        self.record.skill()
    }

    /// Returns the type name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.record.name()
    }

    /// Returns the persisted record, reconciled at registration.
    #[must_use]
    pub fn record(&self) -> &DeviceTypeRecord {
        &self.record
    }

    /// Returns the plugin definition.
    #[must_use]
    pub fn definition(&self) -> &Arc<dyn DeviceTypeDefinition> {
        &self.definition
    }

    /// Returns the capabilities the plugin declares.
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        self.definition.capabilities()
    }

    /// Returns `true` if the type is hidden from users.
    #[must_use]
    pub fn is_internal_only(&self) -> bool {
        self.record.internal_only()
    }

    /// Settings for a new device of this type.
    #[must_use]
    pub fn initial_device_settings(&self) -> SettingsValues {
        self.record.device_schema().default_values()
    }

    /// Settings for a new device-to-location link of this type.
    #[must_use]
    pub fn initial_location_settings(&self) -> SettingsValues {
        self.record.location_schema().default_values()
    }

    /// Attaches the owning skill and stamps its name on every device.
    ///
    /// Only a weak reference is kept; the skill owns the type, not the other
    /// way around. Returns the number of devices updated.
    ///
    /// # Errors
    ///
    /// Returns an error if the device registry cannot be updated.
    pub fn attach_skill(&self, skill: &Arc<dyn Skill>) -> Result<usize> {
        *self.skill.write() = Some(Arc::downgrade(skill));
        let updated = self.devices.assign_skill(self.id(), skill.name())?;
        tracing::debug!(device_type = %self, skill = skill.name(), updated, "Skill attached");
        Ok(updated)
    }

    /// Re-stamps the attached skill's name on every device.
    ///
    /// Logs and returns `0` if no skill is attached or it was dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the device registry cannot be updated.
    pub fn check_devices(&self) -> Result<usize> {
        let Some(skill) = self.skill() else {
            tracing::debug!(device_type = %self, "No skill attached, skipping device check");
            return Ok(0);
        };
        self.devices.assign_skill(self.id(), skill.name())
    }

    /// Returns the owning skill while it is alive.
    #[must_use]
    pub fn skill(&self) -> Option<Arc<dyn Skill>> {
        self.skill.read().as_ref().and_then(Weak::upgrade)
    }

    /// Resolves the status icon of `device`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Capability`] if the plugin does not implement status
    /// icons or fails to resolve one.
    pub fn status_icon(&self, device: &Device) -> Result<IconDescriptor> {
        let view = TelemetryView::new(self.telemetry.as_deref(), device.site_id());
        self.call(Capability::StatusIcon, "status_icon", || {
            self.definition.status_icon(device, &view)
        })
    }

    /// Executes the primary action on `device`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Capability`] if the plugin does not implement toggling
    /// or the action failed.
    pub fn toggle(&self, device: &Device) -> Result<()> {
        self.call(Capability::Toggle, "toggle", || self.definition.toggle(device))
    }

    /// Renames `device` unless the plugin refuses.
    ///
    /// Returns `false` if the plugin refused; the name is unchanged then.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Capability`] if the plugin hook failed.
    pub fn rename(&self, device: &Device, new_name: &str) -> Result<bool> {
        let accepted = self.hook("on_rename", || self.definition.on_rename(device, new_name))?;

        if accepted {
            device.set_name(new_name);
            tracing::debug!(device_type = %self, device_id = %device.id(), new_name, "Device renamed");
        } else {
            tracing::debug!(device_type = %self, device_id = %device.id(), "Rename refused by plugin");
        }
        Ok(accepted)
    }

    /// Moves `device` to `location` and notifies the plugin.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Capability`] if the plugin hook failed. The device
    /// has moved regardless.
    pub fn change_location(&self, device: &Device, location: Option<LocationId>) -> Result<()> {
        device.set_location(location);
        self.hook("on_changed_location", || self.definition.on_changed_location(device))
    }

    /// Returns the plugin configuration of `device`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Capability`] if the plugin hook failed.
    pub fn device_config(&self, device: &Device) -> Result<Option<Value>> {
        self.hook("device_config", || self.definition.device_config(device))
    }

    fn capability_error(&self, source: CapabilityError) -> Error {
        Error::Capability {
            device_type: self.to_string(),
            source,
        }
    }

    fn call<T>(
        &self,
        capability: Capability,
        hook: &'static str,
        f: impl FnOnce() -> std::result::Result<T, CapabilityError>,
    ) -> Result<T> {
        if let Err(source) = require(self.capabilities(), capability) {
            tracing::warn!(device_type = %self, %capability, error = %source, "Capability call failed");
            return Err(self.capability_error(source));
        }
        self.hook(hook, f)
    }

    /// Runs a plugin hook at the contract boundary, logging any failure.
    fn hook<T>(
        &self,
        hook: &'static str,
        f: impl FnOnce() -> std::result::Result<T, CapabilityError>,
    ) -> Result<T> {
        guarded(hook, f).map_err(|source| {
            tracing::warn!(device_type = %self, hook, error = %source, "Plugin hook failed");
            self.capability_error(source)
        })
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.record, f)
    }
}

impl fmt::Debug for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceType")
            .field("record", &self.record)
            .field("capabilities", &self.capabilities())
            .field("skill_attached", &self.skill().is_some())
            .finish_non_exhaustive()
    }
}
