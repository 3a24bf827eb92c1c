// ── Domain model ──
//
// Host-facing types: entity descriptors held by the registry and the
// notifications published by the router.

pub mod entity;
pub mod notification;

pub use entity::{BLE_KEY, EntityDescriptor, LOGS_KEY, SYSTEMS_KIND};
pub use notification::{BeaconNotification, Diagnostic, StateNotification};
