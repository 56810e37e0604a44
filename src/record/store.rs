// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device type record store.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use super::{DeviceTypeOptions, DeviceTypeRecord};
use crate::error::{Error, NotFound, PersistenceError, Result};
use crate::persistence::{Persistence, Predicate, Row};
use crate::schema::SettingsSchema;
use crate::types::DeviceTypeId;

/// Table holding device type records.
pub const DEVICE_TYPES_TABLE: &str = "deviceTypes";

const DEV_SETTINGS_COLUMN: &str = "devSettings";
const LOC_SETTINGS_COLUMN: &str = "locSettings";

/// Creates, loads and updates [`DeviceTypeRecord`]s.
///
/// Writes issued through one store are serialized, which is enough to keep
/// `(skill, name)` unique and to make schema updates single-row
/// read-modify-write operations.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use devtype_lib::persistence::MemoryPersistence;
/// use devtype_lib::record::{DeviceTypeOptions, RecordStore};
/// use devtype_lib::schema::SettingsSchema;
///
/// # fn main() -> devtype_lib::Result<()> {
/// let store = RecordStore::new(Arc::new(MemoryPersistence::new()));
/// let schema = SettingsSchema::builder().setting("brightness", 0).build();
///
/// let created = store.create(
///     "LightsPlugin",
///     "RGBBulb",
///     schema,
///     SettingsSchema::empty(),
///     DeviceTypeOptions::default(),
/// )?;
///
/// let loaded = store.load("LightsPlugin", "RGBBulb")?;
/// assert_eq!(created, loaded);
/// # Ok(())
/// # }
/// ```
pub struct RecordStore {
    backend: Arc<dyn Persistence>,
    write_lock: Mutex<()>,
}

impl RecordStore {
    /// Creates a store on top of a persistence backend.
    #[must_use]
    pub fn new(backend: Arc<dyn Persistence>) -> Self {
        Self {
            backend,
            write_lock: Mutex::new(()),
        }
    }

    /// Loads the record for `(skill, name)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no such type exists, or a persistence
    /// error if the backend fails or the row cannot be decoded.
    pub fn load(&self, skill: &str, name: &str) -> Result<DeviceTypeRecord> {
        self.find(skill, name)?.ok_or_else(|| {
            NotFound::TypeByName {
                skill: skill.to_string(),
                name: name.to_string(),
            }
            .into()
        })
    }

    /// Loads the record with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no such type exists, or a persistence
    /// error if the backend fails or the row cannot be decoded.
    pub fn load_by_id(&self, id: DeviceTypeId) -> Result<DeviceTypeRecord> {
        self.fetch(&Predicate::eq("id", id.value()))?
            .ok_or_else(|| NotFound::Type(id).into())
    }

    /// Creates a new record and assigns its id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateType`] if `(skill, name)` already exists; no
    /// record is written in that case. Persistence failures are surfaced.
    pub fn create(
        &self,
        skill: &str,
        name: &str,
        device_schema: SettingsSchema,
        location_schema: SettingsSchema,
        options: DeviceTypeOptions,
    ) -> Result<DeviceTypeRecord> {
        let _guard = self.write_lock.lock();

        if self.find(skill, name)?.is_some() {
            return Err(Error::DuplicateType {
                skill: skill.to_string(),
                name: name.to_string(),
            });
        }

        let mut record = DeviceTypeRecord {
            id: DeviceTypeId::UNASSIGNED,
            skill: skill.to_string(),
            name: name.to_string(),
            options,
            device_schema,
            location_schema,
        };

        let id = self.backend.insert(DEVICE_TYPES_TABLE, record.to_row()?)?;
        record.id = DeviceTypeId::new(id);

        tracing::info!(device_type = %record, id = %record.id, "Created device type record");
        Ok(record)
    }

    /// Replaces both persisted schemas.
    ///
    /// Returns `true` if anything was written. Writing is skipped when the
    /// persisted schemas are already structurally identical.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id; persistence failures are
    /// surfaced.
    pub fn update_schemas(
        &self,
        id: DeviceTypeId,
        device_schema: &SettingsSchema,
        location_schema: &SettingsSchema,
    ) -> Result<bool> {
        let _guard = self.write_lock.lock();
        let current = self.load_by_id(id)?;

        let mut values = Row::new();
        if current.device_schema != *device_schema {
            values.insert(DEV_SETTINGS_COLUMN.to_string(), schema_column(device_schema)?);
        }
        if current.location_schema != *location_schema {
            values.insert(LOC_SETTINGS_COLUMN.to_string(), schema_column(location_schema)?);
        }

        self.write_columns(id, values)
    }

    /// Replaces the persisted per-device schema if it differs.
    ///
    /// # Errors
    ///
    /// See [`update_schemas`](Self::update_schemas).
    pub fn update_device_schema(&self, id: DeviceTypeId, schema: &SettingsSchema) -> Result<bool> {
        self.update_one_schema(id, DEV_SETTINGS_COLUMN, schema, |r| &r.device_schema)
    }

    /// Replaces the persisted per-link schema if it differs.
    ///
    /// # Errors
    ///
    /// See [`update_schemas`](Self::update_schemas).
    pub fn update_location_schema(
        &self,
        id: DeviceTypeId,
        schema: &SettingsSchema,
    ) -> Result<bool> {
        self.update_one_schema(id, LOC_SETTINGS_COLUMN, schema, |r| &r.location_schema)
    }

    fn update_one_schema(
        &self,
        id: DeviceTypeId,
        column: &str,
        schema: &SettingsSchema,
        persisted: impl Fn(&DeviceTypeRecord) -> &SettingsSchema,
    ) -> Result<bool> {
        let _guard = self.write_lock.lock();
        let current = self.load_by_id(id)?;

        let mut values = Row::new();
        if persisted(&current) != schema {
            values.insert(column.to_string(), schema_column(schema)?);
        }

        self.write_columns(id, values)
    }

    fn write_columns(&self, id: DeviceTypeId, values: Row) -> Result<bool> {
        if values.is_empty() {
            tracing::debug!(%id, "Schemas unchanged, skipping write");
            return Ok(false);
        }

        let touched = self
            .backend
            .update(DEVICE_TYPES_TABLE, values, &Predicate::eq("id", id.value()))?;
        if touched == 0 {
            return Err(NotFound::Type(id).into());
        }

        Ok(true)
    }

    fn find(&self, skill: &str, name: &str) -> Result<Option<DeviceTypeRecord>> {
        self.fetch(&Predicate::eq("skill", skill).and("name", name))
    }

    fn fetch(&self, predicate: &Predicate) -> Result<Option<DeviceTypeRecord>> {
        self.backend
            .fetch_one(DEVICE_TYPES_TABLE, predicate)?
            .map(|row| DeviceTypeRecord::from_row(DEVICE_TYPES_TABLE, row))
            .transpose()
            .map_err(Error::from)
    }
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore").finish_non_exhaustive()
    }
}

fn schema_column(schema: &SettingsSchema) -> std::result::Result<Value, PersistenceError> {
    Ok(Value::String(schema.to_json()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryPersistence;

    fn store() -> (Arc<MemoryPersistence>, RecordStore) {
        let backend = Arc::new(MemoryPersistence::new());
        let store = RecordStore::new(backend.clone());
        (backend, store)
    }

    fn brightness() -> SettingsSchema {
        SettingsSchema::builder().setting("brightness", 0).build()
    }

    fn create_bulb(store: &RecordStore) -> Result<DeviceTypeRecord> {
        store.create(
            "LightsPlugin",
            "RGBBulb",
            brightness(),
            SettingsSchema::empty(),
            DeviceTypeOptions::default(),
        )
    }

    #[test]
    fn create_assigns_id() {
        let (_, store) = store();
        let record = create_bulb(&store).unwrap();
        assert!(record.id().is_assigned());
        assert_eq!(record.device_schema(), &brightness());
    }

    #[test]
    fn duplicate_create_fails_without_writing() {
        let (backend, store) = store();
        create_bulb(&store).unwrap();
        let writes = backend.write_count();

        let err = create_bulb(&store).unwrap_err();

        assert!(matches!(err, Error::DuplicateType { .. }));
        assert_eq!(backend.write_count(), writes);
        assert_eq!(backend.row_count(DEVICE_TYPES_TABLE), 1);
    }

    #[test]
    fn same_name_in_other_skill_is_allowed() {
        let (_, store) = store();
        create_bulb(&store).unwrap();
        let other = store
            .create(
                "OtherLights",
                "RGBBulb",
                brightness(),
                SettingsSchema::empty(),
                DeviceTypeOptions::default(),
            )
            .unwrap();
        assert_eq!(other.skill(), "OtherLights");
    }

    #[test]
    fn load_unknown_is_not_found() {
        let (_, store) = store();
        let err = store.load("LightsPlugin", "Nope").unwrap_err();
        assert!(matches!(err, Error::NotFound(NotFound::TypeByName { .. })));

        let err = store.load_by_id(DeviceTypeId::new(99)).unwrap_err();
        assert!(matches!(err, Error::NotFound(NotFound::Type(_))));
    }

    #[test]
    fn update_schemas_is_idempotent() {
        let (backend, store) = store();
        let record = create_bulb(&store).unwrap();
        let v2 = brightness_and_color();

        assert!(store.update_schemas(record.id(), &v2, &SettingsSchema::empty()).unwrap());
        let writes = backend.write_count();

        assert!(!store.update_schemas(record.id(), &v2, &SettingsSchema::empty()).unwrap());
        assert_eq!(backend.write_count(), writes);
        assert_eq!(store.load_by_id(record.id()).unwrap().device_schema(), &v2);
    }

    #[test]
    fn single_schema_updates_leave_the_other_alone() {
        let (_, store) = store();
        let record = create_bulb(&store).unwrap();
        let room = SettingsSchema::builder().setting("scene", "relax").build();

        assert!(store.update_location_schema(record.id(), &room).unwrap());

        let loaded = store.load_by_id(record.id()).unwrap();
        assert_eq!(loaded.device_schema(), &brightness());
        assert_eq!(loaded.location_schema(), &room);
    }

    #[test]
    fn update_unknown_id_is_not_found() {
        let (_, store) = store();
        create_bulb(&store).unwrap();
        let err = store
            .update_device_schema(DeviceTypeId::new(42), &brightness())
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(NotFound::Type(_))));
    }

    #[test]
    fn backend_failure_is_surfaced() {
        let (backend, store) = store();
        backend.set_failing(true);
        let err = create_bulb(&store).unwrap_err();
        assert!(matches!(err, Error::Persistence(PersistenceError::Backend(_))));
    }

    #[test]
    fn non_finite_default_is_rejected_before_writing() {
        let (backend, store) = store();
        let unstorable = SettingsSchema::builder().setting("gain", f64::NAN).build();

        let err = store
            .create(
                "AudioPlugin",
                "Amp",
                unstorable.clone(),
                SettingsSchema::empty(),
                DeviceTypeOptions::default(),
            )
            .unwrap_err();
        assert!(matches!(err, Error::Persistence(PersistenceError::Codec(_))));
        assert_eq!(backend.row_count(DEVICE_TYPES_TABLE), 0);

        let record = create_bulb(&store).unwrap();
        let writes = backend.write_count();
        let err = store.update_device_schema(record.id(), &unstorable).unwrap_err();
        assert!(matches!(err, Error::Persistence(PersistenceError::Codec(_))));
        assert_eq!(backend.write_count(), writes);
        assert_eq!(store.load_by_id(record.id()).unwrap().device_schema(), &brightness());
    }

    fn brightness_and_color() -> SettingsSchema {
        SettingsSchema::builder()
            .setting("brightness", 0)
            .setting("color", "#fff")
            .build()
    }
}
