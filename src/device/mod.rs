// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device instances, location links and the device registry contract.
//!
//! Device instances are owned by the host's device registry. This module
//! defines what the library needs from it:
//!
//! - [`SettingsTarget`]: anything holding settings values that must follow a
//!   schema change (devices and device-to-location links)
//! - [`DeviceRegistry`]: enumeration of targets per device type, skill
//!   assignment and pairing write-back
//!
//! [`Device`] and [`DeviceLink`] are ready-made targets applying the standard
//! migration policy, and [`MemoryDeviceRegistry`] keeps them in memory.

mod instance;
mod link;
mod memory;

pub use instance::Device;
pub use link::DeviceLink;
pub use memory::MemoryDeviceRegistry;

use std::fmt;
use std::sync::Arc;

use crate::error::{CapabilityError, Result};
use crate::schema::SettingsSchema;
use crate::types::{DeviceId, DeviceTypeId, LinkId};

/// Identifies a settings holder in migration reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum MigrationTarget {
    /// A device instance.
    Device(DeviceId),
    /// A device-to-location link.
    Link(LinkId),
}

impl fmt::Display for MigrationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Device(id) => write!(f, "device {id}"),
            Self::Link(id) => write!(f, "link {id}"),
        }
    }
}

/// A holder of settings values bound to a schema.
pub trait SettingsTarget: Send + Sync {
    /// Returns the identity used in migration reports.
    fn target(&self) -> MigrationTarget;

    /// Restructures the stored settings to match `schema`.
    ///
    /// Called once per reconciliation run in which the relevant schema
    /// drifted, never on ordinary settings reads.
    ///
    /// # Errors
    ///
    /// Returns an error if the holder could not migrate; its previous
    /// settings must then be left untouched.
    fn migrate_settings(&self, schema: &SettingsSchema) -> std::result::Result<(), CapabilityError>;
}

/// The host's device registry, as seen by this library.
pub trait DeviceRegistry: Send + Sync {
    /// Returns every device instance of the given type.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot enumerate devices.
    fn devices_by_type(&self, type_id: DeviceTypeId) -> Result<Vec<Arc<dyn SettingsTarget>>>;

    /// Returns every device-to-location link of the given type.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot enumerate links.
    fn links_by_type(&self, type_id: DeviceTypeId) -> Result<Vec<Arc<dyn SettingsTarget>>>;

    /// Records `skill` as the handling skill of every device of the type.
    ///
    /// Returns the number of devices updated.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be updated.
    fn assign_skill(&self, type_id: DeviceTypeId, skill: &str) -> Result<usize>;

    /// Persists the physical identifier just assigned to `device`.
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot be saved.
    fn save_uid(&self, device: &Device) -> Result<()>;
}
