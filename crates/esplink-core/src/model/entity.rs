// ── Entity descriptors ──

use serde::{Deserialize, Serialize};
use serde_json::Value;

use esplink_api::{EntityInfo, LogLevel, Payload};

/// Key of the synthetic log-stream entity.
pub const LOGS_KEY: &str = "logs";

/// Key of the synthetic BLE-scanner entity.
pub const BLE_KEY: &str = "ble";

/// Kind shared by both synthetic entities.
pub const SYSTEMS_KIND: &str = "Systems";

/// An entity known for the current connection epoch.
///
/// Either reported by the device during discovery or fabricated locally for
/// an enabled subsystem (`logs`, `ble`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    /// Device-assigned identifier (or `logs` / `ble`).
    pub key: String,

    /// Entity type, e.g. `"Switch"`, `"Sensor"`, `"Systems"`.
    #[serde(rename = "type")]
    pub kind: String,

    /// Display name.
    pub name: String,

    /// Device-specific configuration, kept opaque.
    #[serde(default, skip_serializing_if = "Payload::is_empty")]
    pub config: Payload,
}

impl EntityDescriptor {
    /// The synthetic log-stream entity. Its `deviceClass` carries the
    /// configured level name.
    pub fn logs(level: LogLevel) -> Self {
        let mut config = Payload::new();
        config.insert("deviceClass".into(), Value::String(level.to_string()));
        Self {
            key: LOGS_KEY.into(),
            kind: SYSTEMS_KIND.into(),
            name: "Logs".into(),
            config,
        }
    }

    /// The synthetic BLE-scanner entity.
    pub fn ble() -> Self {
        Self {
            key: BLE_KEY.into(),
            kind: SYSTEMS_KIND.into(),
            name: "BLE".into(),
            config: Payload::new(),
        }
    }

    /// Whether this entry was fabricated locally rather than advertised.
    pub fn is_synthetic(&self) -> bool {
        self.kind == SYSTEMS_KIND && (self.key == LOGS_KEY || self.key == BLE_KEY)
    }
}

impl From<EntityInfo> for EntityDescriptor {
    fn from(info: EntityInfo) -> Self {
        Self {
            key: info.key,
            kind: info.kind,
            name: info.name,
            config: info.config,
        }
    }
}
