// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device instance.

use parking_lot::{Mutex, RwLock};

use super::{MigrationTarget, SettingsTarget};
use crate::error::CapabilityError;
use crate::schema::{SettingsSchema, SettingsValues};
use crate::types::{DeviceId, DeviceTypeId, LocationId};

/// One physical device known to the registry.
///
/// Settings writes are serialized through an internal lock, so a migration
/// and a concurrent settings update never interleave on the same device.
///
/// # Examples
///
/// ```
/// use devtype_lib::device::Device;
/// use devtype_lib::types::{DeviceId, DeviceTypeId};
///
/// let device = Device::new(DeviceId::new(1), DeviceTypeId::new(3), "kitchen")
///     .with_name("Ceiling light");
///
/// assert!(!device.is_paired());
/// device.pairing_done("AA:BB:CC");
/// assert_eq!(device.uid().as_deref(), Some("AA:BB:CC"));
/// ```
#[derive(Debug)]
pub struct Device {
    id: DeviceId,
    type_id: DeviceTypeId,
    site_id: String,
    name: RwLock<String>,
    location: RwLock<Option<LocationId>>,
    uid: RwLock<Option<String>>,
    skill_name: RwLock<Option<String>>,
    settings: Mutex<SettingsValues>,
}

impl Device {
    /// Creates a device of the given type, reachable under `site_id`.
    #[must_use]
    pub fn new(id: DeviceId, type_id: DeviceTypeId, site_id: impl Into<String>) -> Self {
        Self {
            id,
            type_id,
            site_id: site_id.into(),
            name: RwLock::new(String::new()),
            location: RwLock::new(None),
            uid: RwLock::new(None),
            skill_name: RwLock::new(None),
            settings: Mutex::new(SettingsValues::new()),
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(self, name: impl Into<String>) -> Self {
        *self.name.write() = name.into();
        self
    }

    /// Sets the stored settings.
    #[must_use]
    pub fn with_settings(self, settings: SettingsValues) -> Self {
        *self.settings.lock() = settings;
        self
    }

    /// Sets the location.
    #[must_use]
    pub fn with_location(self, location: LocationId) -> Self {
        *self.location.write() = Some(location);
        self
    }

    /// Sets an already known physical identifier.
    #[must_use]
    pub fn with_uid(self, uid: impl Into<String>) -> Self {
        *self.uid.write() = Some(uid.into());
        self
    }

    /// Returns the device id.
    #[must_use]
    pub fn id(&self) -> DeviceId {
        self.id
    }

    /// Returns the device type id.
    #[must_use]
    pub fn type_id(&self) -> DeviceTypeId {
        self.type_id
    }

    /// Returns the site id used to look up telemetry.
    #[must_use]
    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> String {
        self.name.read().clone()
    }

    /// Changes the display name.
    pub fn set_name(&self, name: impl Into<String>) {
        *self.name.write() = name.into();
    }

    /// Returns the current location.
    #[must_use]
    pub fn location(&self) -> Option<LocationId> {
        *self.location.read()
    }

    /// Moves the device to another location.
    pub fn set_location(&self, location: Option<LocationId>) {
        *self.location.write() = location;
    }

    /// Returns the physical identifier, once paired.
    #[must_use]
    pub fn uid(&self) -> Option<String> {
        self.uid.read().clone()
    }

    /// Returns `true` once a physical identifier is assigned.
    #[must_use]
    pub fn is_paired(&self) -> bool {
        self.uid.read().is_some()
    }

    /// Assigns the physical identifier found by pairing.
    pub fn pairing_done(&self, uid: impl Into<String>) {
        *self.uid.write() = Some(uid.into());
    }

    pub(crate) fn restore_uid(&self, uid: Option<String>) {
        *self.uid.write() = uid;
    }

    /// Returns the name of the skill currently handling this device.
    #[must_use]
    pub fn skill_name(&self) -> Option<String> {
        self.skill_name.read().clone()
    }

    /// Records the skill handling this device.
    pub fn set_skill_name(&self, skill: impl Into<String>) {
        *self.skill_name.write() = Some(skill.into());
    }

    /// Returns a snapshot of the stored settings.
    #[must_use]
    pub fn settings(&self) -> SettingsValues {
        self.settings.lock().clone()
    }

    /// Applies `update` to the stored settings under the settings lock.
    pub fn update_settings<R>(&self, update: impl FnOnce(&mut SettingsValues) -> R) -> R {
        update(&mut self.settings.lock())
    }
}

impl SettingsTarget for Device {
    fn target(&self) -> MigrationTarget {
        MigrationTarget::Device(self.id)
    }

    fn migrate_settings(&self, schema: &SettingsSchema) -> Result<(), CapabilityError> {
        let mut settings = self.settings.lock();
        *settings = schema.migrate(&settings);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SettingValue;

    fn device() -> Device {
        Device::new(DeviceId::new(1), DeviceTypeId::new(2), "kitchen")
    }

    #[test]
    fn migrate_settings_applies_schema_policy() {
        let device = device().with_settings([("a", 1), ("b", 2)].into_iter().collect());
        let schema = SettingsSchema::builder().setting("a", 0).setting("c", 5).build();

        device.migrate_settings(&schema).unwrap();

        let expected: SettingsValues = [("a", 1), ("c", 5)].into_iter().collect();
        assert_eq!(device.settings(), expected);
    }

    #[test]
    fn update_settings_returns_closure_result() {
        let device = device();
        let previous = device.update_settings(|s| s.set("brightness", 80));
        assert!(previous.is_none());
        assert_eq!(device.settings().get("brightness"), Some(&SettingValue::Int(80)));
    }

    #[test]
    fn rename_and_move() {
        let device = device().with_name("Lamp");
        device.set_name("Desk lamp");
        device.set_location(Some(LocationId::new(4)));

        assert_eq!(device.name(), "Desk lamp");
        assert_eq!(device.location(), Some(LocationId::new(4)));
    }

    #[test]
    fn target_identifies_device() {
        assert_eq!(device().target(), MigrationTarget::Device(DeviceId::new(1)));
    }
}
