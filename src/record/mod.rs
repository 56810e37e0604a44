// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Persisted device type identity.
//!
//! A [`DeviceTypeRecord`] is what the database knows about one plugin-declared
//! device category: its surrogate id, owning skill, name, declared limits and
//! the *last reconciled* settings schemas. The [`RecordStore`] creates, loads
//! and updates records through the [`Persistence`](crate::persistence::Persistence)
//! collaborator and guarantees `(skill, name)` uniqueness.

mod device_type_record;
mod store;

pub use device_type_record::{DeviceTypeOptions, DeviceTypeRecord};
pub use store::{DEVICE_TYPES_TABLE, RecordStore};
