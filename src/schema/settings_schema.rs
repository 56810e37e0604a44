// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Settings schema and stored settings values.

use std::collections::BTreeMap;
use std::collections::btree_map;

use serde::{Deserialize, Serialize};

use super::{SchemaDelta, SettingKind, SettingValue};

/// Immutable description of the configurable fields of a device type.
///
/// Keys are kept sorted, so two schemas declaring the same keys with the
/// same defaults are equal regardless of declaration order. Equality also
/// covers kinds, since a value's kind is part of the value.
///
/// # Examples
///
/// ```
/// use devtype_lib::schema::SettingsSchema;
///
/// let a = SettingsSchema::builder().setting("x", 1).setting("y", true).build();
/// let b = SettingsSchema::builder().setting("y", true).setting("x", 1).build();
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettingsSchema {
    defaults: BTreeMap<String, SettingValue>,
}

impl SettingsSchema {
    /// Creates an empty schema.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns a builder for a new schema.
    #[must_use]
    pub fn builder() -> SettingsSchemaBuilder {
        SettingsSchemaBuilder::default()
    }

    /// Decodes a schema from its serialized JSON object form.
    ///
    /// # Errors
    ///
    /// Returns an error if `json` is not an object of scalar values.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Encodes the schema as a JSON object with sorted keys.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Returns the default value declared for `key`.
    #[must_use]
    pub fn default_of(&self, key: &str) -> Option<&SettingValue> {
        self.defaults.get(key)
    }

    /// Returns the kind declared for `key`.
    #[must_use]
    pub fn kind_of(&self, key: &str) -> Option<SettingKind> {
        self.defaults.get(key).map(SettingValue::kind)
    }

    /// Returns `true` if the schema declares `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.defaults.contains_key(key)
    }

    /// Iterates over the declared keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.defaults.keys().map(String::as_str)
    }

    /// Iterates over `(key, default)` pairs in sorted key order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, SettingValue> {
        self.defaults.iter()
    }

    /// Returns the number of declared settings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.defaults.len()
    }

    /// Returns `true` if no settings are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defaults.is_empty()
    }

    /// Returns a fresh set of values holding every declared default.
    #[must_use]
    pub fn default_values(&self) -> SettingsValues {
        SettingsValues {
            values: self.defaults.clone(),
        }
    }

    /// Computes the delta from `previous` to `self`.
    #[must_use]
    pub fn diff(&self, previous: &Self) -> SchemaDelta {
        let mut delta = SchemaDelta::default();

        for (key, default) in &self.defaults {
            match previous.defaults.get(key) {
                None => delta.added.push(key.clone()),
                Some(old) if old != default => delta.changed.push(key.clone()),
                Some(_) => {}
            }
        }

        delta.removed = previous
            .defaults
            .keys()
            .filter(|key| !self.defaults.contains_key(*key))
            .cloned()
            .collect();

        delta
    }

    /// Migrates stored values to this schema.
    ///
    /// Keys present in both keep their stored value, keys unknown to this
    /// schema are dropped and keys missing from `current` are initialized to
    /// their declared default.
    #[must_use]
    pub fn migrate(&self, current: &SettingsValues) -> SettingsValues {
        let values = self
            .defaults
            .iter()
            .map(|(key, default)| {
                let value = current.values.get(key).unwrap_or(default).clone();
                (key.clone(), value)
            })
            .collect();

        SettingsValues { values }
    }
}

impl<'a> IntoIterator for &'a SettingsSchema {
    type Item = (&'a String, &'a SettingValue);
    type IntoIter = btree_map::Iter<'a, String, SettingValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.defaults.iter()
    }
}

/// Builder for [`SettingsSchema`].
#[derive(Debug, Clone, Default)]
pub struct SettingsSchemaBuilder {
    defaults: BTreeMap<String, SettingValue>,
}

impl SettingsSchemaBuilder {
    /// Declares a setting with its default value.
    ///
    /// Declaring the same key twice keeps the last default.
    #[must_use]
    pub fn setting(mut self, key: impl Into<String>, default: impl Into<SettingValue>) -> Self {
        self.defaults.insert(key.into(), default.into());
        self
    }

    /// Builds the schema.
    #[must_use]
    pub fn build(self) -> SettingsSchema {
        SettingsSchema {
            defaults: self.defaults,
        }
    }
}

/// Settings values stored for one device or link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettingsValues {
    values: BTreeMap<String, SettingValue>,
}

impl SettingsValues {
    /// Creates an empty set of values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value stored for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.values.get(key)
    }

    /// Stores a value, returning the previous one.
    pub fn set(
        &mut self,
        key: impl Into<String>,
        value: impl Into<SettingValue>,
    ) -> Option<SettingValue> {
        self.values.insert(key.into(), value.into())
    }

    /// Removes a value.
    pub fn remove(&mut self, key: &str) -> Option<SettingValue> {
        self.values.remove(key)
    }

    /// Iterates over `(key, value)` pairs in sorted key order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, SettingValue> {
        self.values.iter()
    }

    /// Returns the number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for SettingsValues
where
    K: Into<String>,
    V: Into<SettingValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bulb_v1() -> SettingsSchema {
        SettingsSchema::builder().setting("brightness", 0).build()
    }

    fn bulb_v2() -> SettingsSchema {
        SettingsSchema::builder()
            .setting("brightness", 0)
            .setting("color", "#fff")
            .build()
    }

    #[test]
    fn equality_ignores_declaration_order() {
        let a = SettingsSchema::builder().setting("a", 1).setting("b", 2).build();
        let b = SettingsSchema::builder().setting("b", 2).setting("a", 1).build();
        assert_eq!(a, b);
    }

    #[test]
    fn equality_includes_kind() {
        let int = SettingsSchema::builder().setting("level", 0).build();
        let float = SettingsSchema::builder().setting("level", 0.0).build();
        assert_ne!(int, float);
    }

    #[test]
    fn json_round_trip_is_key_order_independent() {
        let decoded = SettingsSchema::from_json(r#"{"b": 2, "a": 1}"#).unwrap();
        assert_eq!(decoded.to_json().unwrap(), r#"{"a":1,"b":2}"#);
    }

    #[test]
    fn diff_reports_added_removed_changed() {
        let old = SettingsSchema::builder()
            .setting("a", 1)
            .setting("b", 2)
            .setting("c", "x")
            .build();
        let new = SettingsSchema::builder()
            .setting("a", 1)
            .setting("c", "y")
            .setting("d", false)
            .build();

        let delta = new.diff(&old);
        assert_eq!(delta.added(), ["d"]);
        assert_eq!(delta.removed(), ["b"]);
        assert_eq!(delta.changed(), ["c"]);
    }

    #[test]
    fn diff_of_equal_schemas_is_empty() {
        assert!(bulb_v2().diff(&bulb_v2()).is_empty());
    }

    #[test]
    fn migrate_preserves_drops_and_defaults() {
        let schema = SettingsSchema::builder().setting("a", 0).setting("c", 5).build();
        let stored: SettingsValues = [("a", 1), ("b", 2)].into_iter().collect();

        let migrated = schema.migrate(&stored);

        let expected: SettingsValues = [("a", 1), ("c", 5)].into_iter().collect();
        assert_eq!(migrated, expected);
    }

    #[test]
    fn migrate_adds_new_setting_to_existing_device() {
        let stored: SettingsValues = [("brightness", 80)].into_iter().collect();
        let migrated = bulb_v2().migrate(&stored);

        assert_eq!(migrated.get("brightness"), Some(&SettingValue::Int(80)));
        assert_eq!(migrated.get("color"), Some(&SettingValue::from("#fff")));
    }

    #[test]
    fn migrate_to_empty_schema_drops_everything() {
        let stored: SettingsValues = [("brightness", 80)].into_iter().collect();
        assert!(SettingsSchema::empty().migrate(&stored).is_empty());
    }

    #[test]
    fn default_values_match_schema() {
        let values = bulb_v1().default_values();
        assert_eq!(values.len(), 1);
        assert_eq!(values.get("brightness"), Some(&SettingValue::Int(0)));
    }

    #[test]
    fn kind_of_reports_declared_kind() {
        assert_eq!(bulb_v2().kind_of("color"), Some(SettingKind::String));
        assert_eq!(bulb_v2().kind_of("missing"), None);
    }
}
