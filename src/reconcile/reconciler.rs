// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The schema reconciler.

use std::sync::Arc;

use super::{MigrationFailure, ReconcileReport, SchemaScope};
use crate::definition::{DeviceTypeDeclaration, guarded};
use crate::device::{DeviceRegistry, SettingsTarget};
use crate::error::Result;
use crate::event::{EventBus, RegistryEvent};
use crate::record::{DeviceTypeRecord, RecordStore};
use crate::schema::SettingsSchema;

/// Brings a persisted record in line with a declaration.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use devtype_lib::definition::DeviceTypeDeclaration;
/// use devtype_lib::device::{Device, MemoryDeviceRegistry};
/// use devtype_lib::event::EventBus;
/// use devtype_lib::persistence::MemoryPersistence;
/// use devtype_lib::reconcile::SchemaReconciler;
/// use devtype_lib::record::{DeviceTypeOptions, RecordStore};
/// use devtype_lib::schema::{SettingsSchema, SettingsValues};
/// use devtype_lib::types::DeviceId;
///
/// # fn main() -> devtype_lib::Result<()> {
/// let store = RecordStore::new(Arc::new(MemoryPersistence::new()));
/// let devices = MemoryDeviceRegistry::new();
/// let events = EventBus::new();
///
/// let mut record = store.create(
///     "LightsPlugin",
///     "RGBBulb",
///     SettingsSchema::builder().setting("brightness", 0).build(),
///     SettingsSchema::empty(),
///     DeviceTypeOptions::default(),
/// )?;
/// let bulb = devices.add_device(
///     Device::new(DeviceId::new(1), record.id(), "kitchen")
///         .with_settings([("brightness", 80)].into_iter().collect::<SettingsValues>()),
/// );
///
/// let declaration = DeviceTypeDeclaration::new("LightsPlugin", "RGBBulb").with_device_schema(
///     SettingsSchema::builder().setting("brightness", 0).setting("color", "#fff").build(),
/// );
/// let report = SchemaReconciler::new(&store, &devices, &events).reconcile(&mut record, &declaration)?;
///
/// assert_eq!(report.migrated_devices(), 1);
/// assert_eq!(bulb.settings().get("color").and_then(|v| v.as_str()), Some("#fff"));
/// # Ok(())
/// # }
/// ```
pub struct SchemaReconciler<'a> {
    store: &'a RecordStore,
    devices: &'a dyn DeviceRegistry,
    events: &'a EventBus,
}

impl<'a> SchemaReconciler<'a> {
    /// Creates a reconciler over the given collaborators.
    #[must_use]
    pub fn new(store: &'a RecordStore, devices: &'a dyn DeviceRegistry, events: &'a EventBus) -> Self {
        Self {
            store,
            devices,
            events,
        }
    }

    /// Reconciles `record` with `declaration`, updating `record` in place.
    ///
    /// The device and location scopes are handled independently. Migration
    /// failures of single targets are collected in the report, see
    /// [`ReconcileReport::check`].
    ///
    /// # Errors
    ///
    /// Returns an error if targets cannot be enumerated or the schema cannot
    /// be persisted. Nothing has been migrated for the failing scope then.
    pub fn reconcile(
        &self,
        record: &mut DeviceTypeRecord,
        declaration: &DeviceTypeDeclaration,
    ) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::new(record.id());

        for scope in [SchemaScope::Device, SchemaScope::Location] {
            let declared = match scope {
                SchemaScope::Device => declaration.device_schema(),
                SchemaScope::Location => declaration.location_schema(),
            };
            self.reconcile_scope(record, scope, declared, &mut report)?;
        }

        if report.is_noop() {
            tracing::debug!(device_type = %record, "Schemas unchanged");
        }
        Ok(report)
    }

    fn reconcile_scope(
        &self,
        record: &mut DeviceTypeRecord,
        scope: SchemaScope,
        declared: &SettingsSchema,
        report: &mut ReconcileReport,
    ) -> Result<()> {
        let persisted = match scope {
            SchemaScope::Device => &record.device_schema,
            SchemaScope::Location => &record.location_schema,
        };
        let delta = declared.diff(persisted);
        if delta.is_empty() {
            return Ok(());
        }

        let type_id = record.id();
        tracing::info!(device_type = %record, %scope, %delta, "Schema drift detected");

        // Enumerate before persisting so a failing registry leaves the old
        // schema in place and the next run retries.
        let targets = match scope {
            SchemaScope::Device => self.devices.devices_by_type(type_id)?,
            SchemaScope::Location => self.devices.links_by_type(type_id)?,
        };

        match scope {
            SchemaScope::Device => {
                self.store.update_device_schema(type_id, declared)?;
                record.device_schema = declared.clone();
            }
            SchemaScope::Location => {
                self.store.update_location_schema(type_id, declared)?;
                record.location_schema = declared.clone();
            }
        }

        let failed_before = report.failures.len();
        for target in &targets {
            match migrate(target, declared) {
                Ok(()) => report.record_migrated(scope),
                Err(error) => {
                    tracing::warn!(
                        device_type = %record,
                        %scope,
                        target = %target.target(),
                        %error,
                        "Settings migration failed"
                    );
                    report.failures.push(MigrationFailure {
                        scope,
                        target: target.target(),
                        error,
                    });
                }
            }
        }

        let failed = report.failures.len() - failed_before;
        self.events.publish(RegistryEvent::SchemaMigrated {
            type_id,
            scope,
            delta: delta.clone(),
            migrated: targets.len() - failed,
            failed,
        });
        report.record_delta(scope, delta);
        Ok(())
    }
}

fn migrate(
    target: &Arc<dyn SettingsTarget>,
    schema: &SettingsSchema,
) -> std::result::Result<(), crate::error::CapabilityError> {
    guarded("migrate_settings", || target.migrate_settings(schema))
}

impl std::fmt::Debug for SchemaReconciler<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaReconciler")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}
