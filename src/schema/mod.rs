// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Declarative settings schemas and the values stored against them.
//!
//! Every device type declares two independent schemas: one for the settings
//! of each physical device and one for the settings of each device-to-location
//! link. A schema maps a setting key to its default value; the kind of the
//! default (boolean, integer, float, string) is the kind of the setting.
//!
//! # Drift and migration
//!
//! When a plugin changes its declared schema, [`SettingsSchema::diff`] yields
//! the [`SchemaDelta`] against the last persisted version and
//! [`SettingsSchema::migrate`] brings stored values in line:
//!
//! - keys kept by the new schema retain their stored value
//! - keys absent from the new schema are dropped
//! - keys introduced by the new schema get the declared default
//!
//! ```
//! use devtype_lib::schema::{SettingsSchema, SettingsValues};
//!
//! let schema = SettingsSchema::builder()
//!     .setting("a", 0)
//!     .setting("c", 5)
//!     .build();
//!
//! let stored: SettingsValues = [("a", 1), ("b", 2)].into_iter().collect();
//! let migrated = schema.migrate(&stored);
//!
//! assert_eq!(migrated.get("a"), Some(&1.into()));
//! assert_eq!(migrated.get("b"), None);
//! assert_eq!(migrated.get("c"), Some(&5.into()));
//! ```

mod delta;
mod settings_schema;
mod value;

pub use delta::SchemaDelta;
pub use settings_schema::{SettingsSchema, SettingsSchemaBuilder, SettingsValues};
pub use value::{SettingKind, SettingValue};
