// ── Wire-to-domain conversions ──
//
// Bridges raw `hermes_link` payloads (untyped JSON) into canonical
// `hermes_core::model` types. A record that fails to decode is logged and
// skipped; it never poisons the rest of the snapshot.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

use hermes_link::HandshakePayload;

use crate::error::CoreError;
use crate::model::{Board, Device, Entity, EntityId, Group, Profile, ServerSettings};
use crate::store::HandshakeSnapshot;

// ── Helpers ────────────────────────────────────────────────────────

/// Fill in `id` from the map key when the record itself omits it.
fn with_key_id(mut value: Value, key: &str) -> Value {
    if let Value::Object(obj) = &mut value {
        if !obj.contains_key("id") {
            if let Ok(id) = key.parse::<EntityId>() {
                obj.insert("id".into(), Value::from(id.get()));
            }
        }
    }
    value
}

fn decode<T: Entity + DeserializeOwned>(value: Value) -> Result<T, CoreError> {
    serde_json::from_value(value).map_err(|e| CoreError::invalid(T::KIND, &e))
}

/// Decode every entry of a keyed snapshot map, skipping bad records.
fn decode_keyed<T: Entity + DeserializeOwned>(entries: BTreeMap<String, Value>) -> Vec<T> {
    entries
        .into_iter()
        .filter_map(|(key, value)| match decode::<T>(with_key_id(value, &key)) {
            Ok(entity) => Some(entity),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "skipping undecodable {} record", T::KIND);
                None
            }
        })
        .collect()
}

fn decode_list<T: Entity + DeserializeOwned>(entries: Vec<Value>) -> Vec<T> {
    entries
        .into_iter()
        .filter_map(|value| match decode::<T>(value) {
            Ok(entity) => Some(entity),
            Err(e) => {
                tracing::warn!(error = %e, "skipping undecodable {} record", T::KIND);
                None
            }
        })
        .collect()
}

// ── Single records ─────────────────────────────────────────────────

pub fn board_from_value(value: Value) -> Result<Board, CoreError> {
    decode(value)
}

pub fn device_from_value(value: Value) -> Result<Device, CoreError> {
    decode(value)
}

pub fn group_from_value(value: Value) -> Result<Group, CoreError> {
    decode(value)
}

pub fn groups_from_values(values: Vec<Value>) -> Vec<Group> {
    decode_list(values)
}

/// Profile from the handshake; anything unusable yields the default.
pub fn profile_from_value(value: Value) -> Profile {
    if value.is_null() {
        return Profile::default();
    }
    serde_json::from_value(value).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "unusable profile in handshake, using default");
        Profile::default()
    })
}

/// `server` and `web` sections of the controller configuration.
pub fn server_settings(config: &Value) -> (Option<ServerSettings>, Option<ServerSettings>) {
    let section = |name: &str| {
        let raw = config.get(name)?;
        serde_json::from_value::<ServerSettings>(raw.clone())
            .map_err(|e| tracing::debug!(section = name, error = %e, "ignoring config section"))
            .ok()
    };
    (section("server"), section("web"))
}

// ── Full snapshot ──────────────────────────────────────────────────

/// Convert a handshake payload into a store snapshot.
pub fn handshake_snapshot(payload: HandshakePayload) -> HandshakeSnapshot {
    HandshakeSnapshot {
        profile: profile_from_value(payload.profile),
        boards: decode_keyed(payload.boards),
        devices: decode_keyed(payload.devices),
        groups: decode_list(payload.groups),
    }
}
