// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-type pairing state machines.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::session::{
    DiscoveryOutcome, DiscoveryParams, PairingOutcome, PairingSession, PairingState, PairingTicket,
};
use super::PairingCompletion;
use crate::capabilities::Capability;
use crate::definition::{DeviceTypeDefinition, DiscoveryRequest, guarded, require};
use crate::device::{Device, DeviceRegistry};
use crate::error::{CapabilityError, Error, Result};
use crate::event::{EventBus, RegistryEvent};
use crate::types::DeviceTypeId;

/// Default time a session may wait for a completion.
pub(crate) const DEFAULT_WATCHDOG: Duration = Duration::from_secs(60);

struct ActiveSession {
    snapshot: PairingSession,
    generation: u64,
    device: Arc<Device>,
    outcome_tx: Option<oneshot::Sender<PairingOutcome>>,
    watchdog: Option<JoinHandle<()>>,
    // A report won; the session holds the type until it is finalized.
    finishing: bool,
}

/// What a winning report takes out of the session to finalize it.
struct Claim {
    generation: u64,
    device: Arc<Device>,
    snapshot: PairingSession,
    outcome_tx: Option<oneshot::Sender<PairingOutcome>>,
}

type Slot = Arc<Mutex<Option<ActiveSession>>>;

pub(crate) struct CoordinatorInner {
    // One lock per device type; types never contend with each other.
    slots: Mutex<HashMap<DeviceTypeId, Slot>>,
    next_generation: AtomicU64,
    watchdog: Duration,
    events: EventBus,
    devices: Arc<dyn DeviceRegistry>,
}

impl CoordinatorInner {
    fn slot(&self, type_id: DeviceTypeId) -> Slot {
        Arc::clone(self.slots.lock().entry(type_id).or_default())
    }

    fn existing_slot(&self, type_id: DeviceTypeId) -> Option<Slot> {
        self.slots.lock().get(&type_id).cloned()
    }

    /// Removes the session if `generation` matches, without reporting.
    ///
    /// A session already being finalized is left to its finisher.
    fn abandon(&self, type_id: DeviceTypeId, generation: u64) {
        let Some(slot) = self.existing_slot(type_id) else {
            return;
        };
        let mut guard = slot.lock();
        let matches = guard
            .as_ref()
            .is_some_and(|s| s.generation == generation && !s.finishing);
        let stale = if matches { guard.take() } else { None };
        drop(guard);

        if let Some(handle) = stale.and_then(|mut s| s.watchdog.take()) {
            handle.abort();
        }
    }

    /// Ends the active session of `type_id`.
    ///
    /// With `generation` set, only that exact session is ended. Returns
    /// `true` if this call ended a session.
    ///
    /// The winning report is finalized (uid written back, for a pairing)
    /// while the type still reads as discovering; the type returns to idle
    /// before the outcome is announced and delivered.
    pub(crate) fn finish(
        &self,
        type_id: DeviceTypeId,
        generation: Option<u64>,
        outcome: PairingOutcome,
    ) -> bool {
        let Some(slot) = self.existing_slot(type_id) else {
            return false;
        };
        let Some(claim) = Self::claim(&slot, generation) else {
            tracing::debug!(type_id = %type_id, "Pairing report ignored, no matching session");
            return false;
        };

        let outcome = self.apply(&claim.device, &claim.snapshot, outcome);
        {
            let mut guard = slot.lock();
            if guard.as_ref().is_some_and(|s| s.generation == claim.generation) {
                *guard = None;
            }
        }

        self.announce(&claim.snapshot, &outcome);
        if let Some(tx) = claim.outcome_tx {
            // Ticket may have been dropped
            let _ = tx.send(outcome);
        }
        true
    }

    /// Marks the matching session as finishing and disarms its watchdog.
    ///
    /// Only the first report for a session gets a claim.
    fn claim(slot: &Slot, generation: Option<u64>) -> Option<Claim> {
        let mut guard = slot.lock();
        let session = guard
            .as_mut()
            .filter(|s| !s.finishing && generation.is_none_or(|g| g == s.generation))?;

        session.finishing = true;
        if let Some(handle) = session.watchdog.take() {
            handle.abort();
        }
        Some(Claim {
            generation: session.generation,
            device: Arc::clone(&session.device),
            snapshot: session.snapshot.clone(),
            outcome_tx: session.outcome_tx.take(),
        })
    }

    fn apply(
        &self,
        device: &Device,
        session: &PairingSession,
        outcome: PairingOutcome,
    ) -> PairingOutcome {
        let PairingOutcome::Paired { uid } = outcome else {
            return outcome;
        };
        let previous = device.uid();
        device.pairing_done(uid.clone());
        match self.devices.save_uid(device) {
            Ok(()) => PairingOutcome::Paired { uid },
            Err(e) => {
                device.restore_uid(previous);
                tracing::warn!(
                    type_id = %session.type_id,
                    device_id = %session.device_id,
                    error = %e,
                    "Failed to save paired device"
                );
                PairingOutcome::Failed {
                    reason: format!("saving device failed: {e}"),
                }
            }
        }
    }

    fn announce(&self, session: &PairingSession, outcome: &PairingOutcome) {
        let type_id = session.type_id;
        let device_id = session.device_id;
        let reply_site_id = session.reply_site_id.clone();
        let dialogue = session.session;

        let event = match outcome {
            PairingOutcome::Paired { uid } => {
                tracing::info!(type_id = %type_id, device_id = %device_id, uid = %uid, "Device paired");
                RegistryEvent::DevicePaired {
                    type_id,
                    device_id,
                    uid: uid.clone(),
                    reply_site_id,
                    session: dialogue,
                }
            }
            PairingOutcome::Failed { reason } => {
                tracing::info!(type_id = %type_id, device_id = %device_id, reason = %reason, "Discovery failed");
                RegistryEvent::DiscoveryFailed {
                    type_id,
                    device_id,
                    reason: reason.clone(),
                    reply_site_id,
                    session: dialogue,
                }
            }
            PairingOutcome::TimedOut => {
                tracing::info!(type_id = %type_id, device_id = %device_id, "Discovery timed out");
                RegistryEvent::DiscoveryTimedOut {
                    type_id,
                    device_id,
                    reply_site_id,
                    session: dialogue,
                }
            }
        };
        self.events.publish(event);
    }
}

/// Coordinates discovery sessions, one state machine per device type.
///
/// Cheap to clone; clones share the same sessions.
#[derive(Clone)]
pub struct PairingCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl PairingCoordinator {
    /// Creates a coordinator writing paired identifiers back to `devices`.
    ///
    /// Sessions without a completion end after `watchdog`.
    #[must_use]
    pub fn new(devices: Arc<dyn DeviceRegistry>, events: EventBus, watchdog: Duration) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                slots: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(1),
                watchdog,
                events,
                devices,
            }),
        }
    }

    /// Creates a coordinator with the default 60 second watchdog.
    #[must_use]
    pub fn with_defaults(devices: Arc<dyn DeviceRegistry>, events: EventBus) -> Self {
        Self::new(devices, events, DEFAULT_WATCHDOG)
    }

    /// Returns the watchdog window.
    #[must_use]
    pub fn watchdog(&self) -> Duration {
        self.inner.watchdog
    }

    /// Returns the pairing state of a device type.
    #[must_use]
    pub fn state(&self, type_id: DeviceTypeId) -> PairingState {
        if self.session(type_id).is_some() {
            PairingState::Discovering
        } else {
            PairingState::Idle
        }
    }

    /// Returns the active session of a device type.
    #[must_use]
    pub fn session(&self, type_id: DeviceTypeId) -> Option<PairingSession> {
        let slot = self.inner.existing_slot(type_id)?;
        let guard = slot.lock();
        guard.as_ref().map(|s| s.snapshot.clone())
    }

    /// Returns every active session.
    #[must_use]
    pub fn active_sessions(&self) -> Vec<PairingSession> {
        let slots: Vec<Slot> = self.inner.slots.lock().values().cloned().collect();
        slots
            .iter()
            .filter_map(|slot| slot.lock().as_ref().map(|s| s.snapshot.clone()))
            .collect()
    }

    /// Starts pairing `device` through `definition`.
    ///
    /// Returns [`DiscoveryOutcome::Busy`] without side effects if a session
    /// is already active for the type, or if the plugin reports it is busy.
    /// Otherwise the plugin's `discover` hook runs (outside any lock) and the
    /// watchdog is armed on the caller's Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoRuntime`] when called outside a Tokio runtime, and
    /// [`Error::Capability`] if the definition does not implement discovery
    /// or the hook failed. The type stays idle in all these cases.
    pub fn discover(
        &self,
        type_id: DeviceTypeId,
        definition: &dyn DeviceTypeDefinition,
        device: Arc<Device>,
        params: DiscoveryParams,
    ) -> Result<DiscoveryOutcome> {
        let capability_error = |source: CapabilityError| Error::Capability {
            device_type: definition.declaration().to_string(),
            source,
        };
        require(definition.capabilities(), Capability::Discover).map_err(capability_error)?;
        let Ok(runtime) = Handle::try_current() else {
            tracing::warn!(type_id = %type_id, "Discovery needs a Tokio runtime for its watchdog");
            return Err(Error::NoRuntime);
        };

        let slot = self.inner.slot(type_id);
        let (generation, snapshot, receiver) = {
            let mut guard = slot.lock();
            if guard.is_some() {
                tracing::debug!(type_id = %type_id, "Discovery already in progress");
                return Ok(DiscoveryOutcome::Busy);
            }
            let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
            let snapshot = PairingSession {
                type_id,
                device_id: device.id(),
                physical_id: params.physical_id().to_string(),
                reply_site_id: params.reply_site_id().to_string(),
                session: params.session(),
                started_at: Utc::now(),
            };
            let (tx, rx) = oneshot::channel();
            *guard = Some(ActiveSession {
                snapshot: snapshot.clone(),
                generation,
                device: Arc::clone(&device),
                outcome_tx: Some(tx),
                watchdog: None,
                finishing: false,
            });
            (generation, snapshot, rx)
        };

        let completion = PairingCompletion::new(
            Arc::downgrade(&self.inner),
            type_id,
            generation,
            snapshot.physical_id.clone(),
        );
        let request = DiscoveryRequest {
            device,
            physical_id: snapshot.physical_id.clone(),
            reply_site_id: snapshot.reply_site_id.clone(),
            session: snapshot.session,
            completion,
        };

        match guarded("discover", || definition.discover(request)) {
            Ok(true) => {
                self.arm(&runtime, &slot, generation, &snapshot);
                Ok(DiscoveryOutcome::Started(PairingTicket::new(type_id, receiver)))
            }
            Ok(false) => {
                tracing::debug!(type_id = %type_id, "Plugin reported discovery busy");
                self.inner.abandon(type_id, generation);
                Ok(DiscoveryOutcome::Busy)
            }
            Err(e) => {
                tracing::warn!(type_id = %type_id, error = %e, "Discovery could not start");
                self.inner.abandon(type_id, generation);
                Err(capability_error(e))
            }
        }
    }

    /// Arms the watchdog unless the plugin already completed the session.
    fn arm(&self, runtime: &Handle, slot: &Slot, generation: u64, snapshot: &PairingSession) {
        let mut guard = slot.lock();
        let Some(session) = guard
            .as_mut()
            .filter(|s| s.generation == generation && !s.finishing)
        else {
            return;
        };

        let type_id = snapshot.type_id;
        let weak: Weak<CoordinatorInner> = Arc::downgrade(&self.inner);
        let window = self.inner.watchdog;
        session.watchdog = Some(runtime.spawn(async move {
            tokio::time::sleep(window).await;
            if let Some(inner) = weak.upgrade() {
                inner.finish(type_id, Some(generation), PairingOutcome::TimedOut);
            }
        }));

        tracing::info!(
            type_id = %type_id,
            device_id = %snapshot.device_id,
            reply_site_id = %snapshot.reply_site_id,
            "Discovery started"
        );
        self.inner.events.publish(RegistryEvent::DiscoveryStarted {
            type_id,
            device_id: snapshot.device_id,
            reply_site_id: snapshot.reply_site_id.clone(),
            session: snapshot.session,
        });
    }

    /// Cancels the active session of a device type.
    ///
    /// The session ends as failed. Returns `false` if the type was idle.
    pub fn cancel(&self, type_id: DeviceTypeId) -> bool {
        self.inner.finish(
            type_id,
            None,
            PairingOutcome::Failed {
                reason: "cancelled".to_string(),
            },
        )
    }
}

impl std::fmt::Debug for PairingCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PairingCoordinator")
            .field("watchdog", &self.inner.watchdog)
            .field("active_sessions", &self.active_sessions().len())
            .finish_non_exhaustive()
    }
}
