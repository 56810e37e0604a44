// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Registry event types.

use crate::reconcile::SchemaScope;
use crate::schema::SchemaDelta;
use crate::types::{DeviceId, DeviceTypeId, SessionToken};

/// Events emitted by the device type registry and the pairing coordinator.
///
/// Pairing events carry the reply site and the optional dialogue session so
/// the voice layer can route feedback ("device found") to the right place.
#[derive(Debug, Clone)]
pub enum RegistryEvent {
    /// A definition was registered and reconciled.
    TypeRegistered {
        /// The device type.
        type_id: DeviceTypeId,
        /// Owning skill.
        skill: String,
        /// Type name.
        name: String,
        /// Whether the record was created by this registration.
        created: bool,
    },

    /// A schema drifted and was propagated.
    SchemaMigrated {
        /// The device type.
        type_id: DeviceTypeId,
        /// Which schema drifted.
        scope: SchemaScope,
        /// The drift.
        delta: SchemaDelta,
        /// Number of targets migrated.
        migrated: usize,
        /// Number of targets that failed to migrate.
        failed: usize,
    },

    /// A pairing session started.
    DiscoveryStarted {
        /// The device type.
        type_id: DeviceTypeId,
        /// The device awaiting a physical identifier.
        device_id: DeviceId,
        /// Feedback site.
        reply_site_id: String,
        /// Feedback dialogue session.
        session: Option<SessionToken>,
    },

    /// Pairing succeeded.
    DevicePaired {
        /// The device type.
        type_id: DeviceTypeId,
        /// The paired device.
        device_id: DeviceId,
        /// The assigned physical identifier.
        uid: String,
        /// Feedback site.
        reply_site_id: String,
        /// Feedback dialogue session.
        session: Option<SessionToken>,
    },

    /// Pairing failed or was cancelled.
    DiscoveryFailed {
        /// The device type.
        type_id: DeviceTypeId,
        /// The device that stayed unpaired.
        device_id: DeviceId,
        /// Why it failed.
        reason: String,
        /// Feedback site.
        reply_site_id: String,
        /// Feedback dialogue session.
        session: Option<SessionToken>,
    },

    /// No completion arrived within the watchdog window.
    DiscoveryTimedOut {
        /// The device type.
        type_id: DeviceTypeId,
        /// The device that stayed unpaired.
        device_id: DeviceId,
        /// Feedback site.
        reply_site_id: String,
        /// Feedback dialogue session.
        session: Option<SessionToken>,
    },
}

impl RegistryEvent {
    /// Returns the device type this event is about.
    #[must_use]
    pub fn type_id(&self) -> DeviceTypeId {
        match self {
            Self::TypeRegistered { type_id, .. }
            | Self::SchemaMigrated { type_id, .. }
            | Self::DiscoveryStarted { type_id, .. }
            | Self::DevicePaired { type_id, .. }
            | Self::DiscoveryFailed { type_id, .. }
            | Self::DiscoveryTimedOut { type_id, .. } => *type_id,
        }
    }

    /// Returns the dialogue session of a pairing event.
    #[must_use]
    pub fn session(&self) -> Option<SessionToken> {
        match self {
            Self::DiscoveryStarted { session, .. }
            | Self::DevicePaired { session, .. }
            | Self::DiscoveryFailed { session, .. }
            | Self::DiscoveryTimedOut { session, .. } => *session,
            Self::TypeRegistered { .. } | Self::SchemaMigrated { .. } => None,
        }
    }

    /// Returns `true` for pairing lifecycle events.
    #[must_use]
    pub fn is_pairing(&self) -> bool {
        matches!(
            self,
            Self::DiscoveryStarted { .. }
                | Self::DevicePaired { .. }
                | Self::DiscoveryFailed { .. }
                | Self::DiscoveryTimedOut { .. }
        )
    }

    /// Returns `true` if this event ends a pairing session.
    #[must_use]
    pub fn is_pairing_terminal(&self) -> bool {
        matches!(
            self,
            Self::DevicePaired { .. } | Self::DiscoveryFailed { .. } | Self::DiscoveryTimedOut { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairing_events_expose_session() {
        let token = SessionToken::new();
        let event = RegistryEvent::DevicePaired {
            type_id: DeviceTypeId::new(2),
            device_id: DeviceId::new(3),
            uid: "AA".to_string(),
            reply_site_id: "kitchen".to_string(),
            session: Some(token),
        };

        assert_eq!(event.type_id(), DeviceTypeId::new(2));
        assert_eq!(event.session(), Some(token));
        assert!(event.is_pairing());
        assert!(event.is_pairing_terminal());
    }

    #[test]
    fn registration_is_not_pairing() {
        let event = RegistryEvent::TypeRegistered {
            type_id: DeviceTypeId::new(1),
            skill: "s".to_string(),
            name: "n".to_string(),
            created: false,
        };
        assert!(!event.is_pairing());
        assert_eq!(event.session(), None);
    }

    #[test]
    fn started_is_not_terminal() {
        let event = RegistryEvent::DiscoveryStarted {
            type_id: DeviceTypeId::new(1),
            device_id: DeviceId::new(1),
            reply_site_id: "default".to_string(),
            session: None,
        };
        assert!(event.is_pairing());
        assert!(!event.is_pairing_terminal());
    }
}
