//! Typed protocol events emitted by a [`ProtocolClient`](crate::ProtocolClient).
//!
//! Events serialize as internally tagged JSON (`{"event": "newEntity", ...}`),
//! which is also the record format of replay scripts.

use serde::{Deserialize, Serialize};

/// Opaque JSON object carried by state, log and beacon events.
pub type Payload = serde_json::Map<String, serde_json::Value>;

// ── ProtocolEvent ────────────────────────────────────────────────────

/// One event from the device connection, in transport order.
///
/// Lifecycle events (`Connected`, `Disconnected`, `Error`) come from the
/// transport layer; everything else is decoded from the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ProtocolEvent {
    /// Transport or session failure. Non-fatal; reconnect follows.
    Error { message: String },

    /// The transport dropped.
    Disconnected,

    /// The transport is up; handshake and discovery are starting.
    Connected,

    /// Handshake and entity discovery finished.
    Initialized,

    /// Fresh device metadata.
    DeviceInfo(DeviceInfo),

    /// The device advertised an entity during discovery.
    NewEntity(EntityInfo),

    /// State update for a previously advertised entity.
    EntityState { key: String, state: Payload },

    /// Entity-scoped failure (decode error, unsupported state type).
    EntityError { key: String, message: String },

    /// A device log line (only with a log subscription).
    Logs(Payload),

    /// A relayed BLE advertisement (only with a beacon subscription).
    Ble(Payload),
}

impl ProtocolEvent {
    /// Short name for logging, matching the serialized tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Error { .. } => "error",
            Self::Disconnected => "disconnected",
            Self::Connected => "connected",
            Self::Initialized => "initialized",
            Self::DeviceInfo(_) => "deviceInfo",
            Self::NewEntity(_) => "newEntity",
            Self::EntityState { .. } => "entityState",
            Self::EntityError { .. } => "entityError",
            Self::Logs(_) => "logs",
            Self::Ble(_) => "ble",
        }
    }

    /// Whether this event is produced by the transport rather than decoded
    /// from a session.
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            Self::Error { .. } | Self::Disconnected | Self::Connected
        )
    }
}

// ── DeviceInfo ───────────────────────────────────────────────────────

/// Device metadata reported after the handshake.
///
/// Only the commonly used fields are typed; everything else the device sends
/// is kept in `extra` so nothing is silently dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub esphome_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,

    /// All remaining fields the device sends.
    #[serde(flatten)]
    pub extra: Payload,
}

// ── EntityInfo ───────────────────────────────────────────────────────

/// An entity as advertised by the device during discovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityInfo {
    /// Device-assigned identifier, unique within one connection.
    pub key: String,

    /// Entity type, e.g. `"Switch"`, `"Sensor"`, `"BinarySensor"`.
    #[serde(rename = "type")]
    pub kind: String,

    pub name: String,

    #[serde(default)]
    pub config: Payload,
}
