// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `DevType` library.
//!
//! This module provides the error hierarchy shared by the record store, the
//! schema reconciler, the pairing coordinator and the capability contract
//! boundary.

use thiserror::Error;

use crate::reconcile::MigrationFailure;
use crate::types::{DeviceId, DeviceTypeId, LinkId};

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// A device type with the same `(skill, name)` already exists.
    #[error("device type {name} of skill {skill} already exists")]
    DuplicateType {
        /// Owning skill.
        skill: String,
        /// Type name.
        name: String,
    },

    /// The requested type, device or link is unknown.
    #[error("{0} not found")]
    NotFound(#[from] NotFound),

    /// A plugin capability failed or is not implemented.
    #[error("device type {device_type}: {source}")]
    Capability {
        /// Display name of the device type (`skill - name`).
        device_type: String,
        /// The underlying capability failure.
        #[source]
        source: CapabilityError,
    },

    /// Discovery is already running for this device type.
    #[error("discovery already in progress for device type {0}")]
    Busy(DeviceTypeId),

    /// Discovery was requested outside a Tokio runtime, which the pairing
    /// watchdog runs on.
    #[error("discovery requires a Tokio runtime")]
    NoRuntime,

    /// Settings migration failed for some devices or links.
    ///
    /// The reconciliation itself completed; every listed target kept its
    /// previous settings.
    #[error("settings migration failed for {} target(s)", .0.len())]
    MigrationPartialFailure(Vec<MigrationFailure>),

    /// The persistence collaborator failed.
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

impl Error {
    /// Returns the capability error if this is a plugin failure.
    #[must_use]
    pub fn capability(&self) -> Option<&CapabilityError> {
        match self {
            Self::Capability { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Returns `true` if a mandatory capability was called on a plugin that
    /// never implemented it.
    #[must_use]
    pub fn is_unimplemented(&self) -> bool {
        matches!(self.capability(), Some(CapabilityError::Unimplemented { .. }))
    }
}

/// Identifies what could not be found.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotFound {
    /// No device type with this `(skill, name)`.
    #[error("device type {name} of skill {skill}")]
    TypeByName {
        /// Owning skill.
        skill: String,
        /// Type name.
        name: String,
    },

    /// No device type with this id.
    #[error("device type {0}")]
    Type(DeviceTypeId),

    /// No device with this id.
    #[error("device {0}")]
    Device(DeviceId),

    /// No device-to-location link with this id.
    #[error("link {0}")]
    Link(LinkId),
}

/// Failures raised by plugin-supplied capability hooks.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    /// The plugin did not implement a mandatory capability.
    #[error("capability {capability} is not implemented")]
    Unimplemented {
        /// Name of the missing capability.
        capability: &'static str,
    },

    /// The hook ran and reported a failure.
    #[error("capability failed: {0}")]
    Failed(String),

    /// The hook panicked; the panic was contained at the contract boundary.
    #[error("capability panicked: {0}")]
    Panicked(String),
}

impl CapabilityError {
    /// Creates an `Unimplemented` error for the named capability.
    #[must_use]
    pub const fn unimplemented(capability: &'static str) -> Self {
        Self::Unimplemented { capability }
    }

    /// Creates a `Failed` error from any displayable cause.
    #[must_use]
    pub fn failed(cause: impl std::fmt::Display) -> Self {
        Self::Failed(cause.to_string())
    }
}

/// Errors reported by the persistence collaborator.
///
/// These are surfaced as-is; retrying is the collaborator's business.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The backend failed to execute the operation.
    #[error("backend failure: {0}")]
    Backend(String),

    /// The referenced table does not exist.
    #[error("unknown table: {0}")]
    UnknownTable(String),

    /// A stored row could not be decoded.
    #[error("corrupt row in {table}: {message}")]
    CorruptRow {
        /// Table holding the row.
        table: String,
        /// Description of the decoding failure.
        message: String,
    },

    /// Serializing a value for storage failed.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
