// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device type registration and the typed call surface for the admin UI.
//!
//! [`DeviceTypeRegistry`] ties the pieces together:
//!
//! 1. a skill registers a [`DeviceTypeDefinition`](crate::definition::DeviceTypeDefinition)
//! 2. the record is loaded, or created on first registration
//! 3. persisted schemas are reconciled with the declared ones
//! 4. the definition is bound into a [`DeviceType`] that wraps every
//!    capability call in the contract boundary
//!
//! Discovery requests are routed to the shared
//! [`PairingCoordinator`](crate::pairing::PairingCoordinator).

mod config;
mod device_type;
mod type_registry;

pub use config::RegistryConfig;
pub use device_type::DeviceType;
pub use type_registry::{DeviceTypeRegistry, Registration};
