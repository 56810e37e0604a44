// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Completion handle given to plugins.

use std::sync::Weak;

use super::PairingOutcome;
use super::coordinator::CoordinatorInner;
use crate::types::DeviceTypeId;

/// Reports the result of one pairing attempt.
///
/// Cloneable and `Send`, so a plugin can hand it to whatever task talks to
/// the physical device. Only the first report for a session counts; later
/// reports, and reports after a timeout or cancellation, return `false`.
#[derive(Clone)]
pub struct PairingCompletion {
    coordinator: Weak<CoordinatorInner>,
    type_id: DeviceTypeId,
    generation: u64,
    physical_id: String,
}

impl PairingCompletion {
    pub(crate) fn new(
        coordinator: Weak<CoordinatorInner>,
        type_id: DeviceTypeId,
        generation: u64,
        physical_id: String,
    ) -> Self {
        Self {
            coordinator,
            type_id,
            generation,
            physical_id,
        }
    }

    /// Returns the device type of the session.
    #[must_use]
    pub fn type_id(&self) -> DeviceTypeId {
        self.type_id
    }

    /// Returns the physical identifier the caller asked to pair.
    #[must_use]
    pub fn physical_id(&self) -> &str {
        &self.physical_id
    }

    /// Reports success with the identifier of the paired unit.
    ///
    /// Returns `true` if this report ended the session.
    pub fn paired(&self, uid: impl Into<String>) -> bool {
        self.finish(PairingOutcome::Paired { uid: uid.into() })
    }

    /// Reports success using the physical identifier from the request.
    ///
    /// Returns `true` if this report ended the session.
    pub fn pairing_done(&self) -> bool {
        self.paired(self.physical_id.clone())
    }

    /// Reports failure.
    ///
    /// Returns `true` if this report ended the session.
    pub fn failed(&self, reason: impl Into<String>) -> bool {
        self.finish(PairingOutcome::Failed {
            reason: reason.into(),
        })
    }

    fn finish(&self, outcome: PairingOutcome) -> bool {
        self.coordinator.upgrade().is_some_and(|coordinator| {
            coordinator.finish(self.type_id, Some(self.generation), outcome)
        })
    }
}

impl std::fmt::Debug for PairingCompletion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PairingCompletion")
            .field("type_id", &self.type_id)
            .field("generation", &self.generation)
            .field("physical_id", &self.physical_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detached_completion_reports_nothing() {
        let completion =
            PairingCompletion::new(Weak::new(), DeviceTypeId::new(1), 1, "AA".to_string());
        assert!(!completion.pairing_done());
        assert!(!completion.failed("gone"));
        assert_eq!(completion.physical_id(), "AA");
    }
}
