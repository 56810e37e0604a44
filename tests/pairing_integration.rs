// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for discovery and pairing through the registry.

use std::sync::Arc;
use std::time::Duration;

use devtype_lib::definition::{DeviceTypeDeclaration, DeviceTypeDefinition, DiscoveryRequest};
use devtype_lib::device::{Device, DeviceRegistry, MemoryDeviceRegistry};
use devtype_lib::error::{CapabilityError, Error};
use devtype_lib::event::RegistryEvent;
use devtype_lib::pairing::{DiscoveryParams, PairingCompletion, PairingOutcome, PairingState};
use devtype_lib::persistence::MemoryPersistence;
use devtype_lib::registry::{DeviceTypeRegistry, RegistryConfig};
use devtype_lib::types::{DeviceId, DeviceTypeId, SessionToken};
use devtype_lib::Capabilities;
use parking_lot::Mutex;

// ============================================================================
// Fixtures
// ============================================================================

/// Plugin that hands every completion to the test.
struct Pairable {
    declaration: DeviceTypeDeclaration,
    pending: Mutex<Vec<PairingCompletion>>,
}

impl Pairable {
    fn new(name: &str) -> Self {
        Self {
            declaration: DeviceTypeDeclaration::new("ZigbeePlugin", name),
            pending: Mutex::new(Vec::new()),
        }
    }

    fn take(&self) -> PairingCompletion {
        self.pending.lock().pop().expect("no pending completion")
    }
}

impl DeviceTypeDefinition for Pairable {
    fn declaration(&self) -> &DeviceTypeDeclaration {
        &self.declaration
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::builder().with_discover().build()
    }

    fn discover(&self, request: DiscoveryRequest) -> Result<bool, CapabilityError> {
        self.pending.lock().push(request.completion);
        Ok(true)
    }
}

struct Harness {
    registry: Arc<DeviceTypeRegistry>,
    devices: Arc<MemoryDeviceRegistry>,
}

fn harness(config: RegistryConfig) -> Harness {
    let devices = Arc::new(MemoryDeviceRegistry::new());
    let registry = Arc::new(DeviceTypeRegistry::with_config(
        Arc::new(MemoryPersistence::new()),
        Arc::clone(&devices) as Arc<dyn DeviceRegistry>,
        config,
    ));
    Harness { registry, devices }
}

impl Harness {
    fn register(&self, plugin: &Arc<Pairable>) -> DeviceTypeId {
        self.registry
            .register(Arc::clone(plugin) as Arc<dyn DeviceTypeDefinition>)
            .unwrap()
            .device_type()
            .id()
    }

    fn device(&self, id: i64, type_id: DeviceTypeId) -> Arc<Device> {
        self.devices.add_device(Device::new(DeviceId::new(id), type_id, "kitchen"))
    }
}

// ============================================================================
// Single flight
// ============================================================================

mod single_flight {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_discovers_start_exactly_one_session() {
        let h = harness(RegistryConfig::default());
        let plugin = Arc::new(Pairable::new("Plug"));
        let type_id = h.register(&plugin);
        let device = h.device(1, type_id);

        let attempts: Vec<_> = (0..16)
            .map(|i| {
                let registry = Arc::clone(&h.registry);
                let device = Arc::clone(&device);
                tokio::spawn(async move {
                    registry
                        .discover(type_id, device, DiscoveryParams::new(format!("unit-{i}")))
                        .unwrap()
                })
            })
            .collect();

        let mut started = 0;
        let mut busy = 0;
        for attempt in attempts {
            if attempt.await.unwrap().is_busy() {
                busy += 1;
            } else {
                started += 1;
            }
        }

        assert_eq!(started, 1);
        assert_eq!(busy, 15);
        assert_eq!(plugin.pending.lock().len(), 1);
    }

    #[tokio::test]
    async fn busy_as_error() {
        let h = harness(RegistryConfig::default());
        let plugin = Arc::new(Pairable::new("Plug"));
        let type_id = h.register(&plugin);
        let device = h.device(1, type_id);

        let _ticket = h
            .registry
            .try_discover(type_id, Arc::clone(&device), DiscoveryParams::new("AA"))
            .unwrap();
        let second = h.registry.try_discover(type_id, device, DiscoveryParams::new("BB"));

        assert!(matches!(second, Err(Error::Busy(id)) if id == type_id));
    }

    #[tokio::test]
    async fn types_do_not_block_each_other() {
        let h = harness(RegistryConfig::default());
        let plug = Arc::new(Pairable::new("Plug"));
        let sensor = Arc::new(Pairable::new("Sensor"));
        let plug_id = h.register(&plug);
        let sensor_id = h.register(&sensor);

        let a = h
            .registry
            .discover(plug_id, h.device(1, plug_id), DiscoveryParams::new("AA"))
            .unwrap();
        let b = h
            .registry
            .discover(sensor_id, h.device(2, sensor_id), DiscoveryParams::new("BB"))
            .unwrap();

        assert!(!a.is_busy());
        assert!(!b.is_busy());
        assert_eq!(h.registry.coordinator().active_sessions().len(), 2);
    }
}

// ============================================================================
// Completion, timeout and cancellation
// ============================================================================

mod lifecycle {
    use super::*;

    #[tokio::test]
    async fn completion_from_another_task() {
        let h = harness(RegistryConfig::default());
        let plugin = Arc::new(Pairable::new("Plug"));
        let type_id = h.register(&plugin);
        let device = h.device(1, type_id);

        let ticket = h
            .registry
            .try_discover(type_id, Arc::clone(&device), DiscoveryParams::new("0x00158d"))
            .unwrap();

        let completion = plugin.take();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            completion.pairing_done();
        });

        assert_eq!(
            ticket.outcome().await,
            PairingOutcome::Paired {
                uid: "0x00158d".to_string()
            }
        );
        assert_eq!(device.uid().as_deref(), Some("0x00158d"));
        assert_eq!(h.devices.saved_uid(device.id()).as_deref(), Some("0x00158d"));
        assert_eq!(h.registry.pairing_state(type_id), PairingState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn watchdog_frees_the_type() {
        let config = RegistryConfig::default().with_pairing_watchdog(Duration::from_secs(30));
        let h = harness(config);
        let plugin = Arc::new(Pairable::new("Plug"));
        let type_id = h.register(&plugin);
        let device = h.device(1, type_id);

        let ticket = h
            .registry
            .try_discover(type_id, Arc::clone(&device), DiscoveryParams::new("AA"))
            .unwrap();

        tokio::time::advance(Duration::from_secs(29)).await;
        assert_eq!(h.registry.pairing_state(type_id), PairingState::Discovering);

        assert_eq!(ticket.outcome().await, PairingOutcome::TimedOut);
        assert_eq!(h.registry.pairing_state(type_id), PairingState::Idle);
        assert!(!device.is_paired());

        let retry = h
            .registry
            .discover(type_id, device, DiscoveryParams::new("AA"))
            .unwrap();
        assert!(!retry.is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn late_completion_after_timeout_is_ignored() {
        let h = harness(RegistryConfig::default().with_pairing_watchdog(Duration::from_secs(5)));
        let plugin = Arc::new(Pairable::new("Plug"));
        let type_id = h.register(&plugin);
        let device = h.device(1, type_id);

        let ticket = h
            .registry
            .try_discover(type_id, Arc::clone(&device), DiscoveryParams::new("AA"))
            .unwrap();
        assert_eq!(ticket.outcome().await, PairingOutcome::TimedOut);

        assert!(!plugin.take().pairing_done());
        assert!(!device.is_paired());
        assert!(h.devices.saved_uid(device.id()).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn completion_disarms_watchdog() {
        let h = harness(RegistryConfig::default().with_pairing_watchdog(Duration::from_secs(5)));
        let plugin = Arc::new(Pairable::new("Plug"));
        let type_id = h.register(&plugin);
        let mut rx = h.registry.subscribe();

        let ticket = h
            .registry
            .try_discover(type_id, h.device(1, type_id), DiscoveryParams::new("AA"))
            .unwrap();
        assert!(plugin.take().failed("unit rejected join"));
        assert!(matches!(ticket.outcome().await, PairingOutcome::Failed { .. }));

        tokio::time::advance(Duration::from_secs(10)).await;

        let mut terminal = 0;
        while let Ok(event) = rx.try_recv() {
            if event.is_pairing_terminal() {
                terminal += 1;
            }
        }
        assert_eq!(terminal, 1);
    }

    #[tokio::test]
    async fn cancel_counts_as_failure() {
        let h = harness(RegistryConfig::default());
        let plugin = Arc::new(Pairable::new("Plug"));
        let type_id = h.register(&plugin);

        let ticket = h
            .registry
            .try_discover(type_id, h.device(1, type_id), DiscoveryParams::new("AA"))
            .unwrap();

        assert!(h.registry.cancel_discovery(type_id));
        assert!(!h.registry.cancel_discovery(type_id));
        assert_eq!(
            ticket.outcome().await,
            PairingOutcome::Failed {
                reason: "cancelled".to_string()
            }
        );
        assert_eq!(h.registry.pairing_state(type_id), PairingState::Idle);
    }

    #[tokio::test]
    async fn unregistering_skill_cancels_discovery() {
        let h = harness(RegistryConfig::default());
        let plugin = Arc::new(Pairable::new("Plug"));
        let type_id = h.register(&plugin);

        let ticket = h
            .registry
            .try_discover(type_id, h.device(1, type_id), DiscoveryParams::new("AA"))
            .unwrap();
        h.registry.unregister_skill("ZigbeePlugin");

        assert!(matches!(ticket.outcome().await, PairingOutcome::Failed { .. }));
        assert_eq!(h.registry.pairing_state(type_id), PairingState::Idle);
    }
}

// ============================================================================
// Feedback routing
// ============================================================================

mod feedback {
    use super::*;

    #[tokio::test]
    async fn events_carry_session_and_reply_site() {
        let h = harness(RegistryConfig::default());
        let plugin = Arc::new(Pairable::new("Plug"));
        let type_id = h.register(&plugin);
        let mut rx = h.registry.subscribe();
        let token = SessionToken::new();

        let ticket = h
            .registry
            .try_discover(
                type_id,
                h.device(1, type_id),
                DiscoveryParams::new("AA")
                    .with_reply_site("livingroom")
                    .with_session(token),
            )
            .unwrap();
        plugin.take().pairing_done();
        ticket.outcome().await;

        match rx.recv().await.unwrap() {
            RegistryEvent::DiscoveryStarted {
                reply_site_id,
                session,
                ..
            } => {
                assert_eq!(reply_site_id, "livingroom");
                assert_eq!(session, Some(token));
            }
            other => panic!("unexpected event {other:?}"),
        }
        match rx.recv().await.unwrap() {
            RegistryEvent::DevicePaired { uid, session, .. } => {
                assert_eq!(uid, "AA");
                assert_eq!(session, Some(token));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn headless_discovery_uses_default_site() {
        let h = harness(RegistryConfig::default().with_default_reply_site("hall"));
        let plugin = Arc::new(Pairable::new("Plug"));
        let type_id = h.register(&plugin);

        let _ticket = h
            .registry
            .try_discover(type_id, h.device(1, type_id), DiscoveryParams::new("AA"))
            .unwrap();

        let session = h.registry.pairing_session(type_id).unwrap();
        assert_eq!(session.reply_site_id, "hall");
        assert!(session.session.is_none());
        assert!(plugin.take().pairing_done());
    }
}

// ============================================================================
// Plugin-side failures
// ============================================================================

mod plugin_failures {
    use super::*;

    struct Refusing(DeviceTypeDeclaration);

    impl DeviceTypeDefinition for Refusing {
        fn declaration(&self) -> &DeviceTypeDeclaration {
            &self.0
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities::all()
        }

        fn discover(&self, request: DiscoveryRequest) -> Result<bool, CapabilityError> {
            match request.physical_id.as_str() {
                "busy" => Ok(false),
                "broken" => Err(CapabilityError::failed("coordinator offline")),
                _ => panic!("radio firmware crashed"),
            }
        }
    }

    fn refusing(h: &Harness) -> DeviceTypeId {
        h.registry
            .register(Arc::new(Refusing(DeviceTypeDeclaration::new("ZigbeePlugin", "Refusing"))))
            .unwrap()
            .device_type()
            .id()
    }

    #[tokio::test]
    async fn plugin_busy_is_busy() {
        let h = harness(RegistryConfig::default());
        let type_id = refusing(&h);

        let outcome = h
            .registry
            .discover(type_id, h.device(1, type_id), DiscoveryParams::new("busy"))
            .unwrap();

        assert!(outcome.is_busy());
        assert_eq!(h.registry.pairing_state(type_id), PairingState::Idle);
    }

    #[tokio::test]
    async fn plugin_error_leaves_type_idle() {
        let h = harness(RegistryConfig::default());
        let type_id = refusing(&h);

        let err = h
            .registry
            .discover(type_id, h.device(1, type_id), DiscoveryParams::new("broken"))
            .unwrap_err();

        assert_eq!(
            err.capability(),
            Some(&CapabilityError::Failed("coordinator offline".to_string()))
        );
        assert_eq!(h.registry.pairing_state(type_id), PairingState::Idle);
    }

    #[tokio::test]
    async fn plugin_panic_leaves_type_idle() {
        let h = harness(RegistryConfig::default());
        let type_id = refusing(&h);

        let err = h
            .registry
            .discover(type_id, h.device(1, type_id), DiscoveryParams::new("AA"))
            .unwrap_err();

        assert!(matches!(err.capability(), Some(CapabilityError::Panicked(_))));
        assert_eq!(h.registry.pairing_state(type_id), PairingState::Idle);
    }

    #[tokio::test]
    async fn unsaved_pairing_is_a_failure() {
        let h = harness(RegistryConfig::default());
        let plugin = Arc::new(Pairable::new("Plug"));
        let type_id = h.register(&plugin);
        // Not known to the device registry, so saving fails
        let stranger = Arc::new(Device::new(DeviceId::new(77), type_id, "kitchen"));
        let repaired = Arc::new(Device::new(DeviceId::new(78), type_id, "hall").with_uid("OLD"));

        let ticket = h
            .registry
            .try_discover(type_id, Arc::clone(&stranger), DiscoveryParams::new("AA"))
            .unwrap();
        plugin.take().pairing_done();

        assert!(matches!(ticket.outcome().await, PairingOutcome::Failed { .. }));
        assert!(!stranger.is_paired());

        let ticket = h
            .registry
            .try_discover(type_id, Arc::clone(&repaired), DiscoveryParams::new("BB"))
            .unwrap();
        plugin.take().pairing_done();

        assert!(matches!(ticket.outcome().await, PairingOutcome::Failed { .. }));
        assert_eq!(repaired.uid().as_deref(), Some("OLD"));
        assert_eq!(h.registry.pairing_state(type_id), PairingState::Idle);
    }

    #[test]
    fn discovery_outside_runtime_is_refused() {
        let h = harness(RegistryConfig::default());
        let plugin = Arc::new(Pairable::new("Plug"));
        let type_id = h.register(&plugin);

        let err = h
            .registry
            .discover(type_id, h.device(1, type_id), DiscoveryParams::new("AA"))
            .unwrap_err();

        assert!(matches!(err, Error::NoRuntime));
        assert_eq!(h.registry.pairing_state(type_id), PairingState::Idle);
        assert!(plugin.pending.lock().is_empty());

        // Not stuck: the next caller on a runtime gets a session
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let ticket = h
                .registry
                .try_discover(type_id, h.device(1, type_id), DiscoveryParams::new("AA"))
                .unwrap();
            plugin.take().pairing_done();
            assert!(ticket.outcome().await.is_paired());
        });
    }
}
