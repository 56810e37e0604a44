// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Discovery / pairing coordination.
//!
//! The [`PairingCoordinator`] runs one state machine per device type:
//!
//! ```text
//!          discover() ok            paired / failed / cancel / watchdog
//!   Idle ─────────────────▶ Discovering ─────────────────────────────▶ Idle
//!                               │
//!                               └── discover() again ──▶ Busy (no side effects)
//! ```
//!
//! - At most one session per device type; types never block each other.
//! - `discover` only decides busy / not busy, the pairing wait itself is
//!   asynchronous.
//! - Completion, failure, cancellation and the watchdog race for the same
//!   session; the first one to take it wins, the others are no-ops.
//! - A won session keeps the type discovering until the paired uid has been
//!   saved; a failed save restores the device's previous uid.
//! - The watchdog runs on the caller's Tokio runtime. Outside one,
//!   discovery is refused and the type stays idle.
//!
//! Plugins report results through the [`PairingCompletion`] handle they
//! receive in their [`DiscoveryRequest`](crate::definition::DiscoveryRequest).

mod completion;
mod coordinator;
mod session;

pub use completion::PairingCompletion;
pub use coordinator::PairingCoordinator;

pub(crate) use coordinator::DEFAULT_WATCHDOG;
pub(crate) use session::DEFAULT_REPLY_SITE_ID;
pub use session::{
    DiscoveryOutcome, DiscoveryParams, PairingOutcome, PairingSession, PairingState, PairingTicket,
};
