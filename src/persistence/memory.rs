// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory row store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde_json::Value;

use super::{Persistence, Predicate, Row};
use crate::error::PersistenceError;

#[derive(Debug, Default)]
struct Table {
    rows: Vec<Row>,
    last_id: i64,
}

/// Thread-safe in-memory implementation of [`Persistence`].
///
/// Tables are created on first insert. Every successful insert or update is
/// counted, which lets callers check that an operation wrote nothing.
///
/// # Examples
///
/// ```
/// use devtype_lib::persistence::{MemoryPersistence, Persistence, Predicate, Row};
///
/// let store = MemoryPersistence::new();
/// let mut row = Row::new();
/// row.insert("name".to_string(), "kitchen".into());
///
/// let id = store.insert("locations", row).unwrap();
/// let found = store.fetch_one("locations", &Predicate::eq("id", id)).unwrap();
/// assert!(found.is_some());
/// assert_eq!(store.write_count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    tables: Mutex<HashMap<String, Table>>,
    writes: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryPersistence {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of successful inserts and updates so far.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Returns the number of rows in `table`.
    #[must_use]
    pub fn row_count(&self, table: &str) -> usize {
        self.tables.lock().get(table).map_or(0, |t| t.rows.len())
    }

    /// Makes every following operation fail with a backend error until
    /// switched off again.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), PersistenceError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PersistenceError::Backend("backend unavailable".to_string()));
        }
        Ok(())
    }
}

impl Persistence for MemoryPersistence {
    fn fetch_one(&self, table: &str, predicate: &Predicate) -> Result<Option<Row>, PersistenceError> {
        self.check_available()?;

        Ok(self
            .tables
            .lock()
            .get(table)
            .and_then(|t| t.rows.iter().find(|row| predicate.matches(row)).cloned()))
    }

    fn insert(&self, table: &str, mut values: Row) -> Result<i64, PersistenceError> {
        self.check_available()?;

        let mut tables = self.tables.lock();
        let table = tables.entry(table.to_string()).or_default();
        table.last_id += 1;
        let id = table.last_id;
        values.insert("id".to_string(), Value::from(id));
        table.rows.push(values);
        drop(tables);

        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(id)
    }

    fn update(
        &self,
        table: &str,
        values: Row,
        predicate: &Predicate,
    ) -> Result<usize, PersistenceError> {
        self.check_available()?;

        let mut tables = self.tables.lock();
        let table = tables
            .get_mut(table)
            .ok_or_else(|| PersistenceError::UnknownTable(table.to_string()))?;

        let mut touched = 0;
        for row in table.rows.iter_mut().filter(|row| predicate.matches(row)) {
            for (column, value) in &values {
                row.insert(column.clone(), value.clone());
            }
            touched += 1;
        }
        drop(tables);

        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(touched)
    }
}
