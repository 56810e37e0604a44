// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `DevType` Lib - device type registry for home-automation skills.
//!
//! Skills (plugins) declare the categories of physical devices they handle.
//! This library keeps one persisted record per device type, keeps stored
//! settings in line with what the plugin currently declares, and coordinates
//! pairing of new physical units.
//!
//! # Supported Features
//!
//! - **Registration**: load-or-create of `(skill, name)` records through a
//!   pluggable persistence backend
//! - **Schema reconciliation**: drift detection and one-time migration of
//!   device and location-link settings (keep, drop, default)
//! - **Pairing**: single-flight discovery per device type with a watchdog and
//!   at-most-once completion
//! - **Capability contract**: mandatory hooks fail fast with `Unimplemented`,
//!   plugin panics become typed errors
//! - **Events**: registrations, migrations and pairing progress on a
//!   broadcast bus for UI and voice feedback
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use devtype_lib::definition::{DeviceTypeDeclaration, DeviceTypeDefinition, DiscoveryRequest};
//! use devtype_lib::device::{Device, MemoryDeviceRegistry};
//! use devtype_lib::error::CapabilityError;
//! use devtype_lib::pairing::{DiscoveryParams, PairingOutcome};
//! use devtype_lib::persistence::MemoryPersistence;
//! use devtype_lib::registry::DeviceTypeRegistry;
//! use devtype_lib::schema::SettingsSchema;
//! use devtype_lib::types::DeviceId;
//! use devtype_lib::Capabilities;
//!
//! struct Bulb(DeviceTypeDeclaration);
//!
//! impl DeviceTypeDefinition for Bulb {
//!     fn declaration(&self) -> &DeviceTypeDeclaration {
//!         &self.0
//!     }
//!
//!     fn capabilities(&self) -> Capabilities {
//!         Capabilities::builder().with_discover().build()
//!     }
//!
//!     fn discover(&self, request: DiscoveryRequest) -> Result<bool, CapabilityError> {
//!         // Normally handed to the task talking to the bulb
//!         request.completion.pairing_done();
//!         Ok(true)
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> devtype_lib::Result<()> {
//!     let devices = Arc::new(MemoryDeviceRegistry::new());
//!     let registry = DeviceTypeRegistry::new(Arc::new(MemoryPersistence::new()), devices.clone());
//!
//!     let declaration = DeviceTypeDeclaration::new("LightsPlugin", "RGBBulb")
//!         .with_device_schema(SettingsSchema::builder().setting("brightness", 0).build());
//!     let bulb_type = registry.register(Arc::new(Bulb(declaration)))?.device_type().clone();
//!
//!     let device = devices.add_device(Device::new(DeviceId::new(1), bulb_type.id(), "kitchen"));
//!     let ticket = registry.try_discover(bulb_type.id(), device.clone(), DiscoveryParams::new("0x42"))?;
//!
//!     assert_eq!(ticket.outcome().await, PairingOutcome::Paired { uid: "0x42".to_string() });
//!     assert!(device.is_paired());
//!     Ok(())
//! }
//! ```

mod capabilities;
pub mod definition;
pub mod device;
pub mod error;
pub mod event;
pub mod pairing;
pub mod persistence;
pub mod reconcile;
pub mod record;
pub mod registry;
pub mod schema;
pub mod types;

pub use capabilities::{Capabilities, CapabilitiesBuilder, Capability};
pub use definition::{DeviceTypeDeclaration, DeviceTypeDefinition};
pub use error::{CapabilityError, Error, NotFound, PersistenceError, Result};
pub use pairing::{DiscoveryOutcome, DiscoveryParams, PairingOutcome, PairingState};
pub use reconcile::ReconcileReport;
pub use registry::{DeviceType, DeviceTypeRegistry, RegistryConfig};
pub use schema::{SettingsSchema, SettingsValues};
