// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Schema drift detection and settings propagation.
//!
//! When a definition is registered for an already persisted record, the
//! [`SchemaReconciler`] compares the declared schemas against the persisted
//! ones, one scope at a time:
//!
//! 1. unchanged schema: no write, no propagation
//! 2. drifted schema: enumerate the targets, persist the declared schema,
//!    then migrate every target exactly once
//!
//! A target that fails to migrate is recorded in the [`ReconcileReport`];
//! the remaining targets are still migrated.

mod reconciler;
mod report;

pub use reconciler::SchemaReconciler;
pub use report::{MigrationFailure, ReconcileReport, SchemaScope};
