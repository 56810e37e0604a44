// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Identifier and value types shared across the library.
//!
//! - [`DeviceTypeId`], [`DeviceId`], [`LinkId`], [`LocationId`]: integer
//!   surrogate keys assigned by persistence
//! - [`SessionToken`]: opaque dialogue session reference used for feedback
//! - [`IconDescriptor`], [`DeviceStatus`]: rendered device status

mod icon;
mod ids;
mod session_token;

pub use icon::{DeviceStatus, IconDescriptor};
pub use ids::{DeviceId, DeviceTypeId, LinkId, LocationId};
pub use session_token::SessionToken;
