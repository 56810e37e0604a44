// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device type record and its row encoding.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;
use crate::persistence::Row;
use crate::schema::SettingsSchema;
use crate::types::DeviceTypeId;

/// Default liveness ping interval, in seconds.
const DEFAULT_HEARTBEAT_RATE: u32 = 5;

/// Limits and flags declared by a device type.
///
/// Limits are stored, not enforced: the device registry decides what to do
/// with them. `0` means unlimited.
///
/// # Examples
///
/// ```
/// use devtype_lib::record::DeviceTypeOptions;
///
/// let options = DeviceTypeOptions::default()
///     .with_total_device_limit(1)
///     .with_internal_only(true);
///
/// assert!(options.allow_location_links);
/// assert_eq!(options.per_location_limit, 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeviceTypeOptions {
    /// Maximum devices of this type per location.
    pub per_location_limit: u32,
    /// Maximum devices of this type overall.
    pub total_device_limit: u32,
    /// Whether a device may be linked to more than one location.
    pub allow_location_links: bool,
    /// Seconds between expected liveness pings.
    pub heartbeat_rate: u32,
    /// Hidden from user-facing discovery listings.
    pub internal_only: bool,
}

impl Default for DeviceTypeOptions {
    fn default() -> Self {
        Self {
            per_location_limit: 0,
            total_device_limit: 0,
            allow_location_links: true,
            heartbeat_rate: DEFAULT_HEARTBEAT_RATE,
            internal_only: false,
        }
    }
}

impl DeviceTypeOptions {
    /// Sets the per-location device limit.
    #[must_use]
    pub fn with_per_location_limit(mut self, limit: u32) -> Self {
        self.per_location_limit = limit;
        self
    }

    /// Sets the total device limit.
    #[must_use]
    pub fn with_total_device_limit(mut self, limit: u32) -> Self {
        self.total_device_limit = limit;
        self
    }

    /// Sets whether devices may be linked to several locations.
    #[must_use]
    pub fn with_location_links(mut self, allow: bool) -> Self {
        self.allow_location_links = allow;
        self
    }

    /// Sets the heartbeat rate in seconds.
    #[must_use]
    pub fn with_heartbeat_rate(mut self, seconds: u32) -> Self {
        self.heartbeat_rate = seconds;
        self
    }

    /// Marks the type as internal only.
    #[must_use]
    pub fn with_internal_only(mut self, internal_only: bool) -> Self {
        self.internal_only = internal_only;
        self
    }
}

/// Persisted identity of one plugin-declared device category.
///
/// The schemas held here are the last reconciled ones; they only match the
/// plugin's current declaration after reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceTypeRecord {
    pub(crate) id: DeviceTypeId,
    pub(crate) skill: String,
    pub(crate) name: String,
    pub(crate) options: DeviceTypeOptions,
    pub(crate) device_schema: SettingsSchema,
    pub(crate) location_schema: SettingsSchema,
}

impl DeviceTypeRecord {
    /// Returns the record id.
    #[must_use]
    pub fn id(&self) -> DeviceTypeId {
        self.id
    }

    /// Returns the owning skill.
    #[must_use]
    pub fn skill(&self) -> &str {
        &self.skill
    }

    /// Returns the type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared limits and flags.
    #[must_use]
    pub fn options(&self) -> &DeviceTypeOptions {
        &self.options
    }

    /// Returns the per-location limit (`0` = unlimited).
    #[must_use]
    pub fn per_location_limit(&self) -> u32 {
        self.options.per_location_limit
    }

    /// Returns the total device limit (`0` = unlimited).
    #[must_use]
    pub fn total_device_limit(&self) -> u32 {
        self.options.total_device_limit
    }

    /// Returns whether devices may be linked to several locations.
    #[must_use]
    pub fn allow_location_links(&self) -> bool {
        self.options.allow_location_links
    }

    /// Returns the heartbeat interval.
    #[must_use]
    pub fn heartbeat_rate(&self) -> Duration {
        Duration::from_secs(u64::from(self.options.heartbeat_rate))
    }

    /// Returns whether the type is hidden from user-facing listings.
    #[must_use]
    pub fn internal_only(&self) -> bool {
        self.options.internal_only
    }

    /// Returns the last reconciled per-device settings schema.
    #[must_use]
    pub fn device_schema(&self) -> &SettingsSchema {
        &self.device_schema
    }

    /// Returns the last reconciled per-link settings schema.
    #[must_use]
    pub fn location_schema(&self) -> &SettingsSchema {
        &self.location_schema
    }

    pub(crate) fn to_row(&self) -> Result<Row, PersistenceError> {
        let row = RecordRow {
            id: self.id.is_assigned().then_some(self.id),
            skill: self.skill.clone(),
            name: self.name.clone(),
            options: self.options.clone(),
            dev_settings: self.device_schema.to_json()?,
            loc_settings: self.location_schema.to_json()?,
        };

        match serde_json::to_value(row)? {
            serde_json::Value::Object(map) => Ok(map),
            _ => Err(PersistenceError::Backend(
                "record did not serialize to a row".to_string(),
            )),
        }
    }

    pub(crate) fn from_row(table: &str, row: Row) -> Result<Self, PersistenceError> {
        let corrupt = |message: String| PersistenceError::CorruptRow {
            table: table.to_string(),
            message,
        };

        let row: RecordRow = serde_json::from_value(serde_json::Value::Object(row))
            .map_err(|e| corrupt(e.to_string()))?;
        let id = row
            .id
            .filter(DeviceTypeId::is_assigned)
            .ok_or_else(|| corrupt("missing id".to_string()))?;

        Ok(Self {
            id,
            skill: row.skill,
            name: row.name,
            options: row.options,
            device_schema: SettingsSchema::from_json(&row.dev_settings)
                .map_err(|e| corrupt(format!("devSettings: {e}")))?,
            location_schema: SettingsSchema::from_json(&row.loc_settings)
                .map_err(|e| corrupt(format!("locSettings: {e}")))?,
        })
    }
}

impl fmt::Display for DeviceTypeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.skill, self.name)
    }
}

/// Column layout of the device types table.
///
/// Schemas are stored as serialized JSON text and always compared after
/// decoding.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<DeviceTypeId>,
    skill: String,
    name: String,
    #[serde(flatten)]
    options: DeviceTypeOptions,
    dev_settings: String,
    loc_settings: String,
}
