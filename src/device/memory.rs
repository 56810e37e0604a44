// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory device registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::{Device, DeviceLink, DeviceRegistry, SettingsTarget};
use crate::error::{NotFound, Result};
use crate::types::{DeviceId, DeviceTypeId, LinkId};

/// Device registry keeping devices and links in memory.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use devtype_lib::device::{Device, DeviceRegistry, MemoryDeviceRegistry};
/// use devtype_lib::types::{DeviceId, DeviceTypeId};
///
/// # fn main() -> devtype_lib::Result<()> {
/// let registry = MemoryDeviceRegistry::new();
/// registry.add_device(Device::new(DeviceId::new(1), DeviceTypeId::new(7), "kitchen"));
///
/// assert_eq!(registry.devices_by_type(DeviceTypeId::new(7))?.len(), 1);
/// assert!(registry.devices_by_type(DeviceTypeId::new(8))?.is_empty());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryDeviceRegistry {
    devices: RwLock<BTreeMap<DeviceId, Arc<Device>>>,
    links: RwLock<BTreeMap<LinkId, Arc<DeviceLink>>>,
    saved_uids: RwLock<BTreeMap<DeviceId, String>>,
}

impl MemoryDeviceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a device and returns the shared handle.
    pub fn add_device(&self, device: Device) -> Arc<Device> {
        let device = Arc::new(device);
        self.devices.write().insert(device.id(), Arc::clone(&device));
        device
    }

    /// Adds (or replaces) a link and returns the shared handle.
    pub fn add_link(&self, link: DeviceLink) -> Arc<DeviceLink> {
        let link = Arc::new(link);
        self.links.write().insert(link.id(), Arc::clone(&link));
        link
    }

    /// Returns the device with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`NotFound::Device`] for an unknown id.
    pub fn device(&self, id: DeviceId) -> Result<Arc<Device>> {
        self.devices
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| NotFound::Device(id).into())
    }

    /// Returns the link with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`NotFound::Link`] for an unknown id.
    pub fn link(&self, id: LinkId) -> Result<Arc<DeviceLink>> {
        self.links
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| NotFound::Link(id).into())
    }

    /// Returns the physical identifier last saved for a device.
    #[must_use]
    pub fn saved_uid(&self, id: DeviceId) -> Option<String> {
        self.saved_uids.read().get(&id).cloned()
    }

    fn devices_of(&self, type_id: DeviceTypeId) -> Vec<Arc<Device>> {
        self.devices
            .read()
            .values()
            .filter(|d| d.type_id() == type_id)
            .cloned()
            .collect()
    }
}

impl DeviceRegistry for MemoryDeviceRegistry {
    fn devices_by_type(&self, type_id: DeviceTypeId) -> Result<Vec<Arc<dyn SettingsTarget>>> {
        Ok(self
            .devices_of(type_id)
            .into_iter()
            .map(|d| d as Arc<dyn SettingsTarget>)
            .collect())
    }

    fn links_by_type(&self, type_id: DeviceTypeId) -> Result<Vec<Arc<dyn SettingsTarget>>> {
        Ok(self
            .links
            .read()
            .values()
            .filter(|l| l.type_id() == type_id)
            .map(|l| Arc::clone(l) as Arc<dyn SettingsTarget>)
            .collect())
    }

    fn assign_skill(&self, type_id: DeviceTypeId, skill: &str) -> Result<usize> {
        let devices = self.devices_of(type_id);
        for device in &devices {
            device.set_skill_name(skill);
        }
        Ok(devices.len())
    }

    fn save_uid(&self, device: &Device) -> Result<()> {
        let uid = device.uid().ok_or(NotFound::Device(device.id()))?;
        self.device(device.id())?;
        self.saved_uids.write().insert(device.id(), uid);
        Ok(())
    }
}
