// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device-to-location link.

use parking_lot::Mutex;

use super::{MigrationTarget, SettingsTarget};
use crate::error::CapabilityError;
use crate::schema::{SettingsSchema, SettingsValues};
use crate::types::{DeviceId, DeviceTypeId, LinkId, LocationId};

/// Association between a device and a location, with its own settings.
#[derive(Debug)]
pub struct DeviceLink {
    id: LinkId,
    device_id: DeviceId,
    type_id: DeviceTypeId,
    location_id: LocationId,
    settings: Mutex<SettingsValues>,
}

impl DeviceLink {
    /// Creates a link with empty settings.
    #[must_use]
    pub fn new(
        id: LinkId,
        device_id: DeviceId,
        type_id: DeviceTypeId,
        location_id: LocationId,
    ) -> Self {
        Self {
            id,
            device_id,
            type_id,
            location_id,
            settings: Mutex::new(SettingsValues::new()),
        }
    }

    /// Sets the stored settings.
    #[must_use]
    pub fn with_settings(self, settings: SettingsValues) -> Self {
        *self.settings.lock() = settings;
        self
    }

    /// Returns the link id.
    #[must_use]
    pub fn id(&self) -> LinkId {
        self.id
    }

    /// Returns the linked device.
    #[must_use]
    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }

    /// Returns the type of the linked device.
    #[must_use]
    pub fn type_id(&self) -> DeviceTypeId {
        self.type_id
    }

    /// Returns the linked location.
    #[must_use]
    pub fn location_id(&self) -> LocationId {
        self.location_id
    }

    /// Returns a snapshot of the stored settings.
    #[must_use]
    pub fn settings(&self) -> SettingsValues {
        self.settings.lock().clone()
    }
}

impl SettingsTarget for DeviceLink {
    fn target(&self) -> MigrationTarget {
        MigrationTarget::Link(self.id)
    }

    fn migrate_settings(&self, schema: &SettingsSchema) -> Result<(), CapabilityError> {
        let mut settings = self.settings.lock();
        *settings = schema.migrate(&settings);
        Ok(())
    }
}
