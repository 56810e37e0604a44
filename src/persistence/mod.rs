// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Persistence collaborator contract.
//!
//! The library stores device type records through the [`Persistence`] trait,
//! which mirrors a generic row store: fetch one row, insert a row, update
//! rows. Each operation is expected to be atomic for a single row; nothing
//! here requires multi-row transactions.
//!
//! [`MemoryPersistence`] is an in-process implementation, useful for tests
//! and for hosts that persist elsewhere.

mod memory;

pub use memory::MemoryPersistence;

use serde_json::Value;

use crate::error::PersistenceError;

/// A stored row: column name to JSON value.
pub type Row = serde_json::Map<String, Value>;

/// Conjunction of column equality tests.
///
/// # Examples
///
/// ```
/// use devtype_lib::persistence::Predicate;
///
/// let by_identity = Predicate::eq("skill", "LightsPlugin").and("name", "RGBBulb");
/// assert_eq!(by_identity.clauses().len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    clauses: Vec<(String, Value)>,
}

impl Predicate {
    /// Creates a predicate matching rows where `column == value`.
    #[must_use]
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::default().and(column, value)
    }

    /// Adds another equality clause.
    #[must_use]
    pub fn and(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push((column.into(), value.into()));
        self
    }

    /// Returns the `(column, value)` clauses.
    #[must_use]
    pub fn clauses(&self) -> &[(String, Value)] {
        &self.clauses
    }

    /// Returns `true` if `row` satisfies every clause.
    #[must_use]
    pub fn matches(&self, row: &Row) -> bool {
        self.clauses
            .iter()
            .all(|(column, value)| row.get(column) == Some(value))
    }
}

/// Generic row storage used by the record store.
///
/// Implementations report failures as [`PersistenceError`]; the library never
/// retries them.
pub trait Persistence: Send + Sync {
    /// Fetches the first row of `table` matching `predicate`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn fetch_one(&self, table: &str, predicate: &Predicate) -> Result<Option<Row>, PersistenceError>;

    /// Inserts a row and returns its assigned `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn insert(&self, table: &str, values: Row) -> Result<i64, PersistenceError>;

    /// Updates the given columns on every row matching `predicate`.
    ///
    /// Returns the number of rows touched.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn update(
        &self,
        table: &str,
        values: Row,
        predicate: &Predicate,
    ) -> Result<usize, PersistenceError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn predicate_matches_all_clauses() {
        let predicate = Predicate::eq("skill", "Lights").and("name", "Bulb");

        assert!(predicate.matches(&row(json!({"skill": "Lights", "name": "Bulb", "id": 1}))));
        assert!(!predicate.matches(&row(json!({"skill": "Lights", "name": "Lock"}))));
        assert!(!predicate.matches(&row(json!({"skill": "Lights"}))));
    }

    #[test]
    fn empty_predicate_matches_everything() {
        assert!(Predicate::default().matches(&row(json!({"a": 1}))));
    }
}
