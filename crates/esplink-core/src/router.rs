// ── Event normalizer ──
//
// Maps raw protocol events onto the host-facing notifications. The router
// owns the state machine and the registry and runs every handler to
// completion on the event loop, so nothing here needs a lock.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tokio::sync::watch;
use tracing::{debug, error, trace, warn};

use esplink_api::{DeviceInfo, EntityInfo, Payload, ProtocolEvent};

use crate::classify::ErrorClass;
use crate::model::{BeaconNotification, Diagnostic, EntityDescriptor, LOGS_KEY, StateNotification};
use crate::notify::Outputs;
use crate::registry::{EntityHandlers, EntityRegistry, SyntheticEntities};
use crate::state::{ConnectionStateMachine, ConnectionStatus, Transition};

/// Adapter state for one device connection.
pub struct EventRouter {
    machine: ConnectionStateMachine,
    registry: EntityRegistry,
    device: Arc<ArcSwapOption<DeviceInfo>>,
    outputs: Outputs,
}

impl EventRouter {
    pub fn new(synthetic: SyntheticEntities, outputs: Outputs) -> Self {
        Self {
            machine: ConnectionStateMachine::new(outputs.clone()),
            registry: EntityRegistry::new(synthetic),
            device: Arc::new(ArcSwapOption::empty()),
            outputs,
        }
    }

    /// Process one raw event.
    pub fn handle(&mut self, event: ProtocolEvent) {
        trace!(event = event.kind(), "protocol event");
        match event {
            ProtocolEvent::Error { message } => self.on_error(&message),
            ProtocolEvent::Disconnected => {
                self.machine.apply(Transition::TransportDisconnected);
            }
            ProtocolEvent::Connected => self.on_connected(),
            ProtocolEvent::Initialized => {
                self.machine.apply(Transition::Initialized);
            }
            ProtocolEvent::DeviceInfo(info) => {
                debug!(name = %info.name, model = ?info.model, "device info");
                self.device.store(Some(Arc::new(info)));
            }
            ProtocolEvent::NewEntity(info) => self.on_new_entity(info),
            ProtocolEvent::EntityState { key, state } => {
                if !self.registry.dispatch_state(&key, state) {
                    debug!(%key, "state for unregistered entity dropped");
                }
            }
            ProtocolEvent::EntityError { key, message } => {
                if !self.registry.dispatch_error(&key, &message) {
                    debug!(%key, "error for unregistered entity dropped");
                }
            }
            ProtocolEvent::Logs(payload) => self.on_logs(payload),
            ProtocolEvent::Ble(payload) => self.on_ble(payload),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.machine.current()
    }

    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.machine.subscribe()
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Shared handle to the current device descriptor.
    pub fn device_handle(&self) -> Arc<ArcSwapOption<DeviceInfo>> {
        Arc::clone(&self.device)
    }

    // ── Handlers ─────────────────────────────────────────────────────

    fn on_connected(&mut self) {
        self.registry.reset();
        self.device.store(None);
        self.machine.apply(Transition::TransportConnected);
    }

    fn on_error(&self, message: &str) {
        let class = ErrorClass::classify(message);
        if class.is_benign() {
            warn!(%class, error = message, "transport error");
        } else {
            error!(%class, error = message, "unexpected transport error");
            self.outputs.publish_diagnostic(Diagnostic {
                class,
                message: message.to_string(),
            });
        }
        self.machine.apply(Transition::TransportError);
    }

    fn on_new_entity(&mut self, info: EntityInfo) {
        let status = self.machine.current();
        if !matches!(status, ConnectionStatus::Connecting | ConnectionStatus::Connected) {
            debug!(key = %info.key, %status, "entity announced outside discovery, dropped");
            return;
        }

        let key = info.key.clone();
        debug!(%key, kind = %info.kind, name = %info.name, "entity discovered");

        let outputs = self.outputs.clone();
        let state_key = key.clone();
        let handlers = EntityHandlers::new(
            move |payload| {
                outputs.publish_state(StateNotification::new(state_key.clone(), payload));
            },
            move |message| trace!(%key, error = message, "entity error swallowed"),
        );
        self.registry.register(EntityDescriptor::from(info), handlers);
    }

    fn on_logs(&self, payload: Payload) {
        if self.registry.synthetic().logs.is_none() {
            debug!("log line with log streaming disabled, dropped");
            return;
        }
        self.outputs.publish_state(StateNotification::new(LOGS_KEY, payload));
    }

    fn on_ble(&self, payload: Payload) {
        if !self.registry.synthetic().ble {
            debug!("BLE advertisement with scanning disabled, dropped");
            return;
        }
        self.outputs.publish_ble(BeaconNotification::new(payload));
    }
}
