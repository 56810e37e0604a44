// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reconciliation results.

use std::fmt;

use serde::Serialize;

use crate::device::MigrationTarget;
use crate::error::{CapabilityError, Error, Result};
use crate::schema::SchemaDelta;
use crate::types::DeviceTypeId;

/// Which of the two schemas of a device type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaScope {
    /// Per-device settings.
    Device,
    /// Per device-to-location link settings.
    Location,
}

impl fmt::Display for SchemaScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Device => f.write_str("device"),
            Self::Location => f.write_str("location"),
        }
    }
}

/// A target whose settings could not be migrated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFailure {
    /// Schema being propagated.
    pub scope: SchemaScope,
    /// The device or link that failed.
    pub target: MigrationTarget,
    /// Why it failed.
    pub error: CapabilityError,
}

impl fmt::Display for MigrationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} schema): {}", self.target, self.scope, self.error)
    }
}

/// Outcome of one reconciliation run.
///
/// A `None` delta means the scope was unchanged and nothing was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    type_id: DeviceTypeId,
    pub(super) device_delta: Option<SchemaDelta>,
    pub(super) location_delta: Option<SchemaDelta>,
    pub(super) migrated_devices: usize,
    pub(super) migrated_links: usize,
    pub(super) failures: Vec<MigrationFailure>,
}

impl ReconcileReport {
    pub(crate) fn new(type_id: DeviceTypeId) -> Self {
        Self {
            type_id,
            device_delta: None,
            location_delta: None,
            migrated_devices: 0,
            migrated_links: 0,
            failures: Vec::new(),
        }
    }

    /// Returns the reconciled device type.
    #[must_use]
    pub fn type_id(&self) -> DeviceTypeId {
        self.type_id
    }

    /// Returns the device schema drift, if the schema changed.
    #[must_use]
    pub fn device_delta(&self) -> Option<&SchemaDelta> {
        self.device_delta.as_ref()
    }

    /// Returns the location schema drift, if the schema changed.
    #[must_use]
    pub fn location_delta(&self) -> Option<&SchemaDelta> {
        self.location_delta.as_ref()
    }

    /// Number of devices migrated successfully.
    #[must_use]
    pub fn migrated_devices(&self) -> usize {
        self.migrated_devices
    }

    /// Number of links migrated successfully.
    #[must_use]
    pub fn migrated_links(&self) -> usize {
        self.migrated_links
    }

    /// Targets that failed to migrate.
    #[must_use]
    pub fn failures(&self) -> &[MigrationFailure] {
        &self.failures
    }

    /// Returns `true` if neither schema drifted.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.device_delta.is_none() && self.location_delta.is_none()
    }

    /// Returns `true` if any target failed to migrate.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Turns collected failures into an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MigrationPartialFailure`] listing every failed target.
    pub fn check(self) -> Result<Self> {
        if self.failures.is_empty() {
            Ok(self)
        } else {
            Err(Error::MigrationPartialFailure(self.failures))
        }
    }

    pub(super) fn record_delta(&mut self, scope: SchemaScope, delta: SchemaDelta) {
        match scope {
            SchemaScope::Device => self.device_delta = Some(delta),
            SchemaScope::Location => self.location_delta = Some(delta),
        }
    }

    pub(super) fn record_migrated(&mut self, scope: SchemaScope) {
        match scope {
            SchemaScope::Device => self.migrated_devices += 1,
            SchemaScope::Location => self.migrated_links += 1,
        }
    }
}
