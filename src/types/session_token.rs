// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Dialogue session token type.

use std::fmt;

use uuid::Uuid;

/// Opaque reference to a dialogue session.
///
/// The voice layer passes one along with a discovery request so that pairing
/// feedback ("device found") can be routed back to the right conversation.
/// The core never interprets it.
///
/// # Examples
///
/// ```
/// use devtype_lib::types::SessionToken;
///
/// let token = SessionToken::new();
/// println!("Session: {}", token);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct SessionToken(Uuid);

impl SessionToken {
    /// Creates a new unique session token.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a token from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SessionToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short = &self.0.to_string()[..8];
        write!(f, "SessionToken({short}...)")
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for SessionToken {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}
