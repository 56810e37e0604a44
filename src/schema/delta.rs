// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Schema drift description.

use serde::Serialize;

/// Difference between a persisted schema and a declared one.
///
/// Computed on every registration, never persisted. Keys are listed in
/// sorted order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaDelta {
    pub(super) added: Vec<String>,
    pub(super) removed: Vec<String>,
    pub(super) changed: Vec<String>,
}

impl SchemaDelta {
    /// Keys declared now but not persisted.
    #[must_use]
    pub fn added(&self) -> &[String] {
        &self.added
    }

    /// Keys persisted but no longer declared.
    #[must_use]
    pub fn removed(&self) -> &[String] {
        &self.removed
    }

    /// Keys whose default value or kind changed.
    #[must_use]
    pub fn changed(&self) -> &[String] {
        &self.changed
    }

    /// Returns `true` if the schemas are structurally identical.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

impl std::fmt::Display for SchemaDelta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "+{} -{} ~{}",
            self.added.len(),
            self.removed.len(),
            self.changed.len()
        )
    }
}
