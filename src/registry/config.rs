// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Registry configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::event::DEFAULT_CHANNEL_CAPACITY;
use crate::pairing::{DEFAULT_REPLY_SITE_ID, DEFAULT_WATCHDOG};

/// Deployment settings of a [`DeviceTypeRegistry`](super::DeviceTypeRegistry).
///
/// Missing fields take their defaults when deserializing, so a partial
/// configuration file is enough.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use devtype_lib::registry::RegistryConfig;
///
/// let config = RegistryConfig::default().with_pairing_watchdog(Duration::from_secs(90));
/// assert_eq!(config.event_capacity, 256);
///
/// let parsed: RegistryConfig = serde_json::from_str(r#"{"pairing_watchdog": 30}"#).unwrap();
/// assert_eq!(parsed.pairing_watchdog, Duration::from_secs(30));
/// assert_eq!(parsed.default_reply_site_id, "default");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// How long a pairing session waits for a completion, in whole seconds.
    #[serde(with = "duration_secs")]
    pub pairing_watchdog: Duration,
    /// Capacity of the event bus.
    pub event_capacity: usize,
    /// Site receiving pairing feedback when the caller names none.
    pub default_reply_site_id: String,
}

impl RegistryConfig {
    /// Sets the pairing watchdog window.
    #[must_use]
    pub fn with_pairing_watchdog(mut self, window: Duration) -> Self {
        self.pairing_watchdog = window;
        self
    }

    /// Sets the event bus capacity.
    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Sets the default feedback site.
    #[must_use]
    pub fn with_default_reply_site(mut self, site_id: impl Into<String>) -> Self {
        self.default_reply_site_id = site_id.into();
        self
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            pairing_watchdog: DEFAULT_WATCHDOG,
            event_capacity: DEFAULT_CHANNEL_CAPACITY,
            default_reply_site_id: DEFAULT_REPLY_SITE_ID.to_string(),
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RegistryConfig::default();
        assert_eq!(config.pairing_watchdog, Duration::from_secs(60));
        assert_eq!(config.event_capacity, 256);
        assert_eq!(config.default_reply_site_id, "default");
    }

    #[test]
    fn serializes_watchdog_as_seconds() {
        let config = RegistryConfig::default()
            .with_pairing_watchdog(Duration::from_secs(45))
            .with_default_reply_site("hall");
        let json = serde_json::to_value(&config).unwrap();

        assert_eq!(json["pairing_watchdog"], 45);
        assert_eq!(json["default_reply_site_id"], "hall");

        let back: RegistryConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn empty_document_is_default() {
        let config: RegistryConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, RegistryConfig::default());
    }
}
