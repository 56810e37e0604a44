// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Contract boundary around plugin hook calls.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::Capabilities;
use crate::capabilities::Capability;
use crate::error::CapabilityError;

/// Fails with `Unimplemented` unless `capability` is declared.
pub(crate) fn require(
    capabilities: Capabilities,
    capability: Capability,
) -> Result<(), CapabilityError> {
    if capabilities.supports(capability) {
        Ok(())
    } else {
        Err(CapabilityError::unimplemented(capability.as_str()))
    }
}

/// Runs a plugin hook, converting a panic into [`CapabilityError::Panicked`].
///
/// Plugin state touched by a panicking hook is not trusted afterwards; the
/// caller only sees the typed error.
pub(crate) fn guarded<T>(
    hook: &'static str,
    call: impl FnOnce() -> Result<T, CapabilityError>,
) -> Result<T, CapabilityError> {
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::warn!(hook, panic = %message, "Plugin hook panicked");
            Err(CapabilityError::Panicked(message))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_checks_flag() {
        let caps = Capabilities::builder().with_toggle().build();
        assert!(require(caps, Capability::Toggle).is_ok());
        assert_eq!(
            require(caps, Capability::Discover),
            Err(CapabilityError::unimplemented("discover"))
        );
    }

    #[test]
    fn guarded_passes_results_through() {
        assert_eq!(guarded("toggle", || Ok(5)), Ok(5));
        assert_eq!(
            guarded::<()>("toggle", || Err(CapabilityError::failed("offline"))),
            Err(CapabilityError::Failed("offline".to_string()))
        );
    }

    #[test]
    fn guarded_contains_panics() {
        let result = guarded::<()>("toggle", || panic!("relay stuck"));
        assert_eq!(result, Err(CapabilityError::Panicked("relay stuck".to_string())));
    }

    #[test]
    fn guarded_contains_formatted_panics() {
        let code = 7;
        let result = guarded::<()>("toggle", || panic!("error code {code}"));
        assert_eq!(result, Err(CapabilityError::Panicked("error code 7".to_string())));
    }
}
