// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integer surrogate keys.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! surrogate_key {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Value of a key that persistence has not assigned yet.
            pub const UNASSIGNED: Self = Self(0);

            /// Creates a key from its raw value.
            #[must_use]
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// Returns the raw value.
            #[must_use]
            pub const fn value(&self) -> i64 {
                self.0
            }

            /// Returns `true` once persistence has assigned the key.
            #[must_use]
            pub const fn is_assigned(&self) -> bool {
                self.0 != 0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

surrogate_key!(
    /// Identifier of a persisted device type record.
    ///
    /// Immutable once assigned.
    DeviceTypeId
);

surrogate_key!(
    /// Identifier of a device instance.
    DeviceId
);

surrogate_key!(
    /// Identifier of a device-to-location link.
    LinkId
);

surrogate_key!(
    /// Identifier of a physical location (room).
    LocationId
);
