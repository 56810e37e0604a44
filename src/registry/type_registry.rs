// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The device type registry.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use super::{DeviceType, RegistryConfig};
use crate::definition::{DeviceTypeDefinition, Skill, Telemetry};
use crate::device::{Device, DeviceRegistry};
use crate::error::{Error, NotFound, Result};
use crate::event::{EventBus, RegistryEvent};
use crate::pairing::{
    DiscoveryOutcome, DiscoveryParams, PairingCoordinator, PairingSession, PairingState,
    PairingTicket,
};
use crate::persistence::Persistence;
use crate::reconcile::{ReconcileReport, SchemaReconciler};
use crate::record::{DeviceTypeRecord, RecordStore};
use crate::types::DeviceTypeId;

/// Result of registering a definition.
#[derive(Debug)]
pub struct Registration {
    device_type: Arc<DeviceType>,
    report: ReconcileReport,
    created: bool,
}

impl Registration {
    /// Returns the registered type.
    #[must_use]
    pub fn device_type(&self) -> &Arc<DeviceType> {
        &self.device_type
    }

    /// Returns what reconciliation did.
    #[must_use]
    pub fn report(&self) -> &ReconcileReport {
        &self.report
    }

    /// Returns `true` if the record was created by this registration.
    #[must_use]
    pub fn created(&self) -> bool {
        self.created
    }

    /// Splits the registration into the type and the report.
    #[must_use]
    pub fn into_parts(self) -> (Arc<DeviceType>, ReconcileReport) {
        (self.device_type, self.report)
    }
}

/// Registers plugin definitions and routes calls to them.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use devtype_lib::definition::{DeviceTypeDeclaration, DeviceTypeDefinition};
/// use devtype_lib::device::MemoryDeviceRegistry;
/// use devtype_lib::persistence::MemoryPersistence;
/// use devtype_lib::registry::DeviceTypeRegistry;
///
/// struct Doorbell(DeviceTypeDeclaration);
///
/// impl DeviceTypeDefinition for Doorbell {
///     fn declaration(&self) -> &DeviceTypeDeclaration {
///         &self.0
///     }
/// }
///
/// # fn main() -> devtype_lib::Result<()> {
/// let registry = DeviceTypeRegistry::new(
///     Arc::new(MemoryPersistence::new()),
///     Arc::new(MemoryDeviceRegistry::new()),
/// );
///
/// let registration = registry.register(Arc::new(Doorbell(DeviceTypeDeclaration::new("Home", "Doorbell"))))?;
/// assert!(registration.created());
/// assert_eq!(registry.get("Home", "Doorbell")?.to_string(), "Home - Doorbell");
/// # Ok(())
/// # }
/// ```
pub struct DeviceTypeRegistry {
    store: RecordStore,
    devices: Arc<dyn DeviceRegistry>,
    telemetry: Option<Arc<dyn Telemetry>>,
    types: RwLock<HashMap<DeviceTypeId, Arc<DeviceType>>>,
    events: EventBus,
    coordinator: PairingCoordinator,
    config: RegistryConfig,
}

impl DeviceTypeRegistry {
    /// Creates a registry with the default configuration.
    #[must_use]
    pub fn new(persistence: Arc<dyn Persistence>, devices: Arc<dyn DeviceRegistry>) -> Self {
        Self::with_config(persistence, devices, RegistryConfig::default())
    }

    /// Creates a registry with the given configuration.
    #[must_use]
    pub fn with_config(
        persistence: Arc<dyn Persistence>,
        devices: Arc<dyn DeviceRegistry>,
        config: RegistryConfig,
    ) -> Self {
        let events = EventBus::with_capacity(config.event_capacity);
        let coordinator = PairingCoordinator::new(
            Arc::clone(&devices),
            events.clone(),
            config.pairing_watchdog,
        );
        Self {
            store: RecordStore::new(persistence),
            devices,
            telemetry: None,
            types: RwLock::new(HashMap::new()),
            events,
            coordinator,
            config,
        }
    }

    /// Sets the telemetry source consulted for status icons.
    ///
    /// Applies to types registered afterwards.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: Arc<dyn Telemetry>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Returns the record store.
    #[must_use]
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Returns the pairing coordinator.
    #[must_use]
    pub fn coordinator(&self) -> &PairingCoordinator {
        &self.coordinator
    }

    /// Subscribes to registry and pairing events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }

    /// Registers a definition, creating or reconciling its record.
    ///
    /// A first registration creates the record from the declaration. Later
    /// registrations reconcile the persisted schemas with the declared ones
    /// and replace the previously bound definition.
    ///
    /// # Errors
    ///
    /// Returns an error if persistence fails or targets cannot be
    /// enumerated. Single targets failing to migrate do not fail the
    /// registration, see [`ReconcileReport::failures`].
    pub fn register(&self, definition: Arc<dyn DeviceTypeDefinition>) -> Result<Registration> {
        let declaration = definition.declaration();
        let (mut record, created) = self.load_or_create(definition.as_ref())?;

        let report = SchemaReconciler::new(&self.store, self.devices.as_ref(), &self.events)
            .reconcile(&mut record, declaration)?;

        let device_type = Arc::new(DeviceType::new(
            record,
            Arc::clone(&definition),
            Arc::clone(&self.devices),
            self.telemetry.clone(),
        ));
        let type_id = device_type.id();
        self.types.write().insert(type_id, Arc::clone(&device_type));

        tracing::info!(
            device_type = %device_type,
            %type_id,
            created,
            capabilities = ?device_type.capabilities(),
            "Device type registered"
        );
        let missing = device_type.capabilities().missing();
        if !missing.is_empty() {
            tracing::debug!(device_type = %device_type, ?missing, "Mandatory capabilities not implemented");
        }

        self.events.publish(RegistryEvent::TypeRegistered {
            type_id,
            skill: device_type.skill_name().to_string(),
            name: device_type.name().to_string(),
            created,
        });

        Ok(Registration {
            device_type,
            report,
            created,
        })
    }

    fn load_or_create(&self, definition: &dyn DeviceTypeDefinition) -> Result<(DeviceTypeRecord, bool)> {
        let declaration = definition.declaration();
        let (skill, name) = (declaration.skill(), declaration.name());

        match self.store.load(skill, name) {
            Ok(record) => Ok((record, false)),
            Err(Error::NotFound(_)) => match self.store.create(
                skill,
                name,
                declaration.device_schema().clone(),
                declaration.location_schema().clone(),
                declaration.options().clone(),
            ) {
                Ok(record) => Ok((record, true)),
                // Lost a concurrent registration race
                Err(Error::DuplicateType { .. }) => Ok((self.store.load(skill, name)?, false)),
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        }
    }

    /// Returns the type registered as `(skill, name)`.
    ///
    /// # Errors
    ///
    /// Returns [`NotFound::TypeByName`] if no such type is registered.
    pub fn get(&self, skill: &str, name: &str) -> Result<Arc<DeviceType>> {
        self.types
            .read()
            .values()
            .find(|t| t.skill_name() == skill && t.name() == name)
            .cloned()
            .ok_or_else(|| {
                NotFound::TypeByName {
                    skill: skill.to_string(),
                    name: name.to_string(),
                }
                .into()
            })
    }

    /// Returns the type with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`NotFound::Type`] if no such type is registered.
    pub fn get_by_id(&self, type_id: DeviceTypeId) -> Result<Arc<DeviceType>> {
        self.types
            .read()
            .get(&type_id)
            .cloned()
            .ok_or_else(|| NotFound::Type(type_id).into())
    }

    /// Returns every registered type, ordered by id.
    #[must_use]
    pub fn device_types(&self) -> Vec<Arc<DeviceType>> {
        self.filtered(|_| true)
    }

    /// Returns the types users may add devices of.
    #[must_use]
    pub fn user_facing(&self) -> Vec<Arc<DeviceType>> {
        self.filtered(|t| !t.is_internal_only())
    }

    /// Returns the types of one skill.
    #[must_use]
    pub fn by_skill(&self, skill: &str) -> Vec<Arc<DeviceType>> {
        self.filtered(|t| t.skill_name() == skill)
    }

    fn filtered(&self, keep: impl Fn(&DeviceType) -> bool) -> Vec<Arc<DeviceType>> {
        let mut types: Vec<_> = self.types.read().values().filter(|t| keep(t)).cloned().collect();
        types.sort_by_key(|t| t.id());
        types
    }

    /// Attaches `skill` to all of its registered types.
    ///
    /// Returns the number of devices stamped with the skill name.
    ///
    /// # Errors
    ///
    /// Returns an error if the device registry cannot be updated.
    pub fn attach_skill(&self, skill: &Arc<dyn Skill>) -> Result<usize> {
        let mut updated = 0;
        for device_type in self.by_skill(skill.name()) {
            updated += device_type.attach_skill(skill)?;
        }
        Ok(updated)
    }

    /// Drops the bound definitions of a skill.
    ///
    /// Records stay persisted; running discoveries are cancelled. Returns the
    /// number of types removed.
    pub fn unregister_skill(&self, skill: &str) -> usize {
        let removed: Vec<DeviceTypeId> = {
            let mut types = self.types.write();
            let ids: Vec<_> = types
                .values()
                .filter(|t| t.skill_name() == skill)
                .map(|t| t.id())
                .collect();
            for id in &ids {
                types.remove(id);
            }
            ids
        };

        for type_id in &removed {
            self.coordinator.cancel(*type_id);
        }
        tracing::info!(skill, removed = removed.len(), "Skill unregistered");
        removed.len()
    }

    /// Starts pairing `device` for its type.
    ///
    /// Without a reply site in `params`, the configured default site is used.
    ///
    /// # Errors
    ///
    /// Returns [`NotFound::Type`] for an unregistered type,
    /// [`Error::NoRuntime`] outside a Tokio runtime, or [`Error::Capability`]
    /// if the plugin does not implement discovery or failed to start it.
    pub fn discover(
        &self,
        type_id: DeviceTypeId,
        device: Arc<Device>,
        params: DiscoveryParams,
    ) -> Result<DiscoveryOutcome> {
        let device_type = self.get_by_id(type_id)?;
        let params = params.or_reply_site(&self.config.default_reply_site_id);

        self.coordinator
            .discover(type_id, device_type.definition().as_ref(), device, params)
    }

    /// Like [`discover`](Self::discover), with busy reported as an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Busy`] if discovery is already running, plus the
    /// errors of [`discover`](Self::discover).
    pub fn try_discover(
        &self,
        type_id: DeviceTypeId,
        device: Arc<Device>,
        params: DiscoveryParams,
    ) -> Result<PairingTicket> {
        self.discover(type_id, device, params)?
            .into_ticket()
            .ok_or(Error::Busy(type_id))
    }

    /// Cancels the running discovery of a type.
    ///
    /// Returns `false` if none was running.
    pub fn cancel_discovery(&self, type_id: DeviceTypeId) -> bool {
        self.coordinator.cancel(type_id)
    }

    /// Returns the pairing state of a type.
    #[must_use]
    pub fn pairing_state(&self, type_id: DeviceTypeId) -> PairingState {
        self.coordinator.state(type_id)
    }

    /// Returns the running pairing session of a type.
    #[must_use]
    pub fn pairing_session(&self, type_id: DeviceTypeId) -> Option<PairingSession> {
        self.coordinator.session(type_id)
    }
}

impl std::fmt::Debug for DeviceTypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceTypeRegistry")
            .field("types", &self.types.read().len())
            .field("config", &self.config)
            .field("coordinator", &self.coordinator)
            .finish_non_exhaustive()
    }
}
