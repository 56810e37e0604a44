// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pairing session types.

use std::fmt;

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;

use crate::types::{DeviceId, DeviceTypeId, SessionToken};

/// Site receiving feedback when the caller does not name one.
pub(crate) const DEFAULT_REPLY_SITE_ID: &str = "default";

/// Pairing state of one device type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PairingState {
    /// No active session.
    #[default]
    Idle,
    /// A session is waiting for the physical unit.
    Discovering,
}

impl PairingState {
    /// Returns `true` while a session is active.
    #[must_use]
    pub const fn is_discovering(&self) -> bool {
        matches!(self, Self::Discovering)
    }
}

/// How a pairing session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingOutcome {
    /// The plugin reported the physical identifier.
    Paired {
        /// The assigned physical identifier.
        uid: String,
    },
    /// The plugin reported a failure, or the session was cancelled.
    Failed {
        /// Why it failed.
        reason: String,
    },
    /// Nothing was reported within the watchdog window.
    TimedOut,
}

impl PairingOutcome {
    /// Returns `true` if the device was paired.
    #[must_use]
    pub const fn is_paired(&self) -> bool {
        matches!(self, Self::Paired { .. })
    }
}

impl fmt::Display for PairingOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Paired { uid } => write!(f, "paired as {uid}"),
            Self::Failed { reason } => write!(f, "failed: {reason}"),
            Self::TimedOut => f.write_str("timed out"),
        }
    }
}

/// Caller-side parameters of a discovery request.
///
/// # Examples
///
/// ```
/// use devtype_lib::pairing::DiscoveryParams;
/// use devtype_lib::types::SessionToken;
///
/// let params = DiscoveryParams::new("zigbee:0x42")
///     .with_reply_site("kitchen")
///     .with_session(SessionToken::new());
///
/// assert_eq!(params.reply_site_id(), "kitchen");
/// assert!(DiscoveryParams::new("x").session().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryParams {
    physical_id: String,
    reply_site_id: Option<String>,
    session: Option<SessionToken>,
}

impl DiscoveryParams {
    /// Creates parameters for pairing the given physical unit.
    ///
    /// `physical_id` may be empty when the plugin finds the unit itself.
    #[must_use]
    pub fn new(physical_id: impl Into<String>) -> Self {
        Self {
            physical_id: physical_id.into(),
            reply_site_id: None,
            session: None,
        }
    }

    /// Sets the site that receives feedback.
    #[must_use]
    pub fn with_reply_site(mut self, site_id: impl Into<String>) -> Self {
        self.reply_site_id = Some(site_id.into());
        self
    }

    /// Correlates feedback with a dialogue session.
    #[must_use]
    pub fn with_session(mut self, session: SessionToken) -> Self {
        self.session = Some(session);
        self
    }

    /// Returns the physical identifier.
    #[must_use]
    pub fn physical_id(&self) -> &str {
        &self.physical_id
    }

    /// Returns the feedback site, falling back to the default site.
    #[must_use]
    pub fn reply_site_id(&self) -> &str {
        self.reply_site_id.as_deref().unwrap_or(DEFAULT_REPLY_SITE_ID)
    }

    /// Returns the dialogue session, if any.
    #[must_use]
    pub fn session(&self) -> Option<SessionToken> {
        self.session
    }

    pub(crate) fn or_reply_site(mut self, site_id: &str) -> Self {
        if self.reply_site_id.is_none() {
            self.reply_site_id = Some(site_id.to_string());
        }
        self
    }
}

/// Snapshot of an active pairing session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingSession {
    /// The device type being paired.
    pub type_id: DeviceTypeId,
    /// The device awaiting a physical identifier.
    pub device_id: DeviceId,
    /// The physical unit, as given by the caller.
    pub physical_id: String,
    /// Feedback site.
    pub reply_site_id: String,
    /// Feedback dialogue session.
    pub session: Option<SessionToken>,
    /// When the session started.
    pub started_at: DateTime<Utc>,
}

/// Result of asking the coordinator to start discovery.
#[derive(Debug)]
pub enum DiscoveryOutcome {
    /// A session started; the ticket resolves when it ends.
    Started(PairingTicket),
    /// Discovery is already in progress for this type.
    Busy,
}

impl DiscoveryOutcome {
    /// Returns `true` if discovery was rejected as busy.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        matches!(self, Self::Busy)
    }

    /// Returns the ticket of a started session.
    #[must_use]
    pub fn into_ticket(self) -> Option<PairingTicket> {
        match self {
            Self::Started(ticket) => Some(ticket),
            Self::Busy => None,
        }
    }
}

/// Resolves to the outcome of one pairing session.
///
/// Dropping the ticket does not affect the session.
#[derive(Debug)]
pub struct PairingTicket {
    type_id: DeviceTypeId,
    receiver: oneshot::Receiver<PairingOutcome>,
}

impl PairingTicket {
    pub(crate) fn new(type_id: DeviceTypeId, receiver: oneshot::Receiver<PairingOutcome>) -> Self {
        Self { type_id, receiver }
    }

    /// Returns the device type of the session.
    #[must_use]
    pub fn type_id(&self) -> DeviceTypeId {
        self.type_id
    }

    /// Waits for the session to end.
    ///
    /// If the coordinator is dropped first, the session counts as failed.
    pub async fn outcome(self) -> PairingOutcome {
        self.receiver
            .await
            .unwrap_or_else(|_| PairingOutcome::Failed {
                reason: "coordinator dropped".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_site_defaults() {
        let params = DiscoveryParams::new("uid");
        assert_eq!(params.reply_site_id(), "default");

        let params = params.or_reply_site("hall");
        assert_eq!(params.reply_site_id(), "hall");

        let explicit = DiscoveryParams::new("uid").with_reply_site("kitchen").or_reply_site("hall");
        assert_eq!(explicit.reply_site_id(), "kitchen");
    }

    #[test]
    fn outcome_display() {
        let paired = PairingOutcome::Paired {
            uid: "AA".to_string(),
        };
        assert!(paired.is_paired());
        assert_eq!(paired.to_string(), "paired as AA");
        assert_eq!(PairingOutcome::TimedOut.to_string(), "timed out");
    }

    #[tokio::test]
    async fn ticket_resolves_with_sent_outcome() {
        let (tx, rx) = oneshot::channel();
        let ticket = PairingTicket::new(DeviceTypeId::new(1), rx);
        tx.send(PairingOutcome::TimedOut).unwrap();
        assert_eq!(ticket.outcome().await, PairingOutcome::TimedOut);
    }

    #[tokio::test]
    async fn ticket_without_sender_reports_failure() {
        let (tx, rx) = oneshot::channel::<PairingOutcome>();
        drop(tx);
        let outcome = PairingTicket::new(DeviceTypeId::new(1), rx).outcome().await;
        assert!(matches!(outcome, PairingOutcome::Failed { .. }));
    }

    #[test]
    fn busy_has_no_ticket() {
        assert!(DiscoveryOutcome::Busy.is_busy());
        assert!(DiscoveryOutcome::Busy.into_ticket().is_none());
    }
}
