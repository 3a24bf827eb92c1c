// ── Host-facing notifications ──
//
// State and beacon notifications flatten the protocol payload next to the
// entity key. The key is authoritative: a payload field of the same name is
// dropped on construction.

use serde::Serialize;

use esplink_api::Payload;

use crate::classify::ErrorClass;
use crate::model::entity::BLE_KEY;

const ENTITY_KEY_FIELD: &str = "entityKey";

/// `{entityKey, ...payload}` for an entity state change or a log line.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateNotification {
    pub entity_key: String,
    #[serde(flatten)]
    pub payload: Payload,
}

impl StateNotification {
    pub fn new(entity_key: impl Into<String>, mut payload: Payload) -> Self {
        payload.remove(ENTITY_KEY_FIELD);
        Self {
            entity_key: entity_key.into(),
            payload,
        }
    }
}

/// `{entityKey: "ble", ...payload}` for a relayed BLE advertisement.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BeaconNotification {
    pub entity_key: String,
    #[serde(flatten)]
    pub payload: Payload,
}

impl BeaconNotification {
    pub fn new(mut payload: Payload) -> Self {
        payload.remove(ENTITY_KEY_FIELD);
        Self {
            entity_key: BLE_KEY.into(),
            payload,
        }
    }
}

/// A transport error that did not match a known-benign class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub class: ErrorClass,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> Payload {
        match value {
            serde_json::Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn state_payload_is_flattened_next_to_key() {
        let note = StateNotification::new("12", payload(json!({ "state": true, "missingState": false })));
        assert_eq!(
            serde_json::to_value(&note).ok(),
            Some(json!({ "entityKey": "12", "state": true, "missingState": false }))
        );
    }

    #[test]
    fn entity_key_in_payload_is_replaced() {
        let note = StateNotification::new("12", payload(json!({ "entityKey": "spoofed", "state": 1 })));
        assert_eq!(note.entity_key, "12");
        assert!(!note.payload.contains_key("entityKey"));
    }

    #[test]
    fn beacon_always_uses_ble_key() {
        let note = BeaconNotification::new(payload(json!({ "address": "AA:BB", "rssi": -70 })));
        assert_eq!(
            serde_json::to_value(&note).ok(),
            Some(json!({ "entityKey": "ble", "address": "AA:BB", "rssi": -70 }))
        );
    }
}
