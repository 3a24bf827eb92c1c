//! Connection lifecycle and event normalization for one ESPHome-class device.
//!
//! This crate sits between an [`esplink_api::ProtocolClient`] and a host
//! that wants a small, stable set of notifications:
//!
//! - **[`Gateway`]**: Facade the host talks to. [`Gateway::start()`] validates
//!   the target, builds [`ClientOptions`](esplink_api::ClientOptions), connects,
//!   and spawns the event loop. [`Gateway::shutdown()`] tears it down.
//!
//! - **[`EventRouter`]**: Maps raw protocol events onto status, state,
//!   beacon and diagnostic notifications, driving the state machine and the
//!   registry as it goes.
//!
//! - **[`ConnectionStateMachine`]**: `disconnected → connecting → connected →
//!   error` with last-write-wins status and a broadcast on every transition.
//!
//! - **[`EntityRegistry`]**: Ordered entity descriptors for the current
//!   connection epoch, with per-entity handlers in a single dispatch table.
//!
//! - **[`Notifier<T>`]**: Unbounded fan-out channel, one per notification
//!   type, with no cap on subscribers.

pub mod classify;
pub mod config;
pub mod error;
pub mod gateway;
pub mod model;
pub mod notify;
pub mod registry;
pub mod router;
pub mod state;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use classify::ErrorClass;
pub use config::GatewayConfig;
pub use error::CoreError;
pub use gateway::{Gateway, GatewayBuilder};
pub use model::{
    BLE_KEY, BeaconNotification, Diagnostic, EntityDescriptor, LOGS_KEY, StateNotification,
    SYSTEMS_KIND,
};
pub use notify::{Notification, Notifier, Outputs};
pub use registry::{EntityHandlers, EntityRegistry, SyntheticEntities};
pub use router::EventRouter;
pub use state::{ConnectionStateMachine, ConnectionStatus, Transition};
pub use stream::EntityStream;

// Protocol types hosts commonly need alongside the gateway.
pub use esplink_api::{DeviceInfo, LogLevel, Payload};
