// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device type declaration.

use std::fmt;

use crate::record::DeviceTypeOptions;
use crate::schema::SettingsSchema;

/// What a plugin declares about one of its device types.
///
/// # Examples
///
/// ```
/// use devtype_lib::definition::DeviceTypeDeclaration;
/// use devtype_lib::schema::SettingsSchema;
///
/// let declaration = DeviceTypeDeclaration::new("LightsPlugin", "RGBBulb")
///     .with_device_schema(SettingsSchema::builder().setting("brightness", 0).build())
///     .with_per_location_limit(4)
///     .with_heartbeat_rate(30);
///
/// assert_eq!(declaration.options().per_location_limit, 4);
/// assert!(declaration.options().allow_location_links);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceTypeDeclaration {
    skill: String,
    name: String,
    device_schema: SettingsSchema,
    location_schema: SettingsSchema,
    options: DeviceTypeOptions,
}

impl DeviceTypeDeclaration {
    /// Declares a type with empty schemas and default options.
    #[must_use]
    pub fn new(skill: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            skill: skill.into(),
            name: name.into(),
            device_schema: SettingsSchema::empty(),
            location_schema: SettingsSchema::empty(),
            options: DeviceTypeOptions::default(),
        }
    }

    /// Sets the per-device settings schema.
    #[must_use]
    pub fn with_device_schema(mut self, schema: SettingsSchema) -> Self {
        self.device_schema = schema;
        self
    }

    /// Sets the per-link settings schema.
    #[must_use]
    pub fn with_location_schema(mut self, schema: SettingsSchema) -> Self {
        self.location_schema = schema;
        self
    }

    /// Replaces all limits and flags at once.
    #[must_use]
    pub fn with_options(mut self, options: DeviceTypeOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the per-location device limit (`0` = unlimited).
    #[must_use]
    pub fn with_per_location_limit(mut self, limit: u32) -> Self {
        self.options.per_location_limit = limit;
        self
    }

    /// Sets the total device limit (`0` = unlimited).
    #[must_use]
    pub fn with_total_device_limit(mut self, limit: u32) -> Self {
        self.options.total_device_limit = limit;
        self
    }

    /// Sets whether devices may be linked to several locations.
    #[must_use]
    pub fn with_location_links(mut self, allow: bool) -> Self {
        self.options.allow_location_links = allow;
        self
    }

    /// Sets the heartbeat rate in seconds.
    #[must_use]
    pub fn with_heartbeat_rate(mut self, seconds: u32) -> Self {
        self.options.heartbeat_rate = seconds;
        self
    }

    /// Hides the type from user-facing discovery listings.
    #[must_use]
    pub fn internal_only(mut self) -> Self {
        self.options.internal_only = true;
        self
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

    /// Returns the declared per-device schema.
    #[must_use]
    pub fn device_schema(&self) -> &SettingsSchema {
        &self.device_schema
    }

    /// Returns the declared per-link schema.
    #[must_use]
    pub fn location_schema(&self) -> &SettingsSchema {
        &self.location_schema
    }

    /// Returns the declared limits and flags.
    #[must_use]
    pub fn options(&self) -> &DeviceTypeOptions {
        &self.options
    }
}

impl fmt::Display for DeviceTypeDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.skill, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let declaration = DeviceTypeDeclaration::new("Skill", "Type");
        assert!(declaration.device_schema().is_empty());
        assert!(declaration.location_schema().is_empty());
        assert_eq!(declaration.options(), &DeviceTypeOptions::default());
    }

    #[test]
    fn builder_sets_flags() {
        let declaration = DeviceTypeDeclaration::new("Skill", "Hub")
            .with_total_device_limit(1)
            .with_location_links(false)
            .internal_only();

        let options = declaration.options();
        assert_eq!(options.total_device_limit, 1);
        assert!(!options.allow_location_links);
        assert!(options.internal_only);
    }

    #[test]
    fn display_names_skill_and_type() {
        assert_eq!(
            DeviceTypeDeclaration::new("LightsPlugin", "RGBBulb").to_string(),
            "LightsPlugin - RGBBulb"
        );
    }
}
