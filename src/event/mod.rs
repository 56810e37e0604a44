// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event system for registry and pairing notifications.
//!
//! The [`EventBus`] uses tokio's broadcast channel so that any number of
//! observers (the admin UI, the dialogue layer giving spoken feedback) can
//! follow registrations, schema migrations and pairing progress. Nothing in
//! the library depends on a subscriber being present.
//!
//! # Examples
//!
//! ```
//! use devtype_lib::event::{EventBus, RegistryEvent};
//! use devtype_lib::types::DeviceTypeId;
//!
//! let bus = EventBus::new();
//! let mut rx = bus.subscribe();
//!
//! bus.publish(RegistryEvent::TypeRegistered {
//!     type_id: DeviceTypeId::new(1),
//!     skill: "LightsPlugin".to_string(),
//!     name: "RGBBulb".to_string(),
//!     created: true,
//! });
//! ```

mod event_bus;
mod registry_event;

pub use event_bus::EventBus;
pub(crate) use event_bus::DEFAULT_CHANNEL_CAPACITY;
pub use registry_event::RegistryEvent;
