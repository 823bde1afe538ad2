//! Server to client wire messages.
//!
//! Numeric fields are read leniently: missing, null, non-numeric or
//! non-finite values become `0` instead of failing the whole message.

use driftlands_common::EntityId;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::ProtocolError;

/// One entity in an `entities` snapshot.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EntityUpdate {
    #[serde(deserialize_with = "lenient_id")]
    pub id: EntityId,
    #[serde(default, deserialize_with = "lenient_f32")]
    pub x: f32,
    #[serde(default, deserialize_with = "lenient_f32")]
    pub y: f32,
    /// Heading in radians.
    #[serde(default, deserialize_with = "lenient_f32")]
    pub angle: f32,
    /// Server time of this sample in milliseconds; `0` means "use the
    /// message time".
    #[serde(default, deserialize_with = "lenient_f64")]
    pub timestamp: f64,
}

/// A world object as sent on spawn and in snapshots.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ObjectWire {
    #[serde(deserialize_with = "lenient_id")]
    pub id: EntityId,
    #[serde(alias = "type", alias = "defId")]
    pub def_id: String,
    #[serde(default, deserialize_with = "lenient_f32")]
    pub x: f32,
    #[serde(default, deserialize_with = "lenient_f32")]
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Entities {
        #[serde(default, deserialize_with = "lenient_f64")]
        time: f64,
        #[serde(default)]
        entities: Vec<EntityUpdate>,
    },
    ObjectSpawn {
        object: ObjectWire,
    },
    ObjectDespawn {
        #[serde(deserialize_with = "lenient_id")]
        id: EntityId,
    },
    ObjectsSnapshot {
        #[serde(default)]
        objects: Vec<ObjectWire>,
    },
    /// Tells the client which entity id it controls.
    You {
        #[serde(deserialize_with = "lenient_id")]
        id: EntityId,
    },
}

impl ServerMessage {
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }
}

fn coerce(value: &Value) -> f64 {
    let v = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        Value::Bool(b) => f64::from(u8::from(*b)),
        _ => 0.0,
    };
    if v.is_finite() { v } else { 0.0 }
}

fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    Ok(coerce(&Value::deserialize(d)?))
}

fn lenient_f32<'de, D: Deserializer<'de>>(d: D) -> Result<f32, D::Error> {
    let v = coerce(&Value::deserialize(d)?) as f32;
    Ok(if v.is_finite() { v } else { 0.0 })
}

fn lenient_id<'de, D: Deserializer<'de>>(d: D) -> Result<EntityId, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => EntityId(s),
        Value::Number(n) => EntityId(n.to_string()),
        other => EntityId(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_entities() {
        let msg = ServerMessage::parse(
            r#"{"type":"entities","time":1000,"entities":[{"id":"a","x":1.5,"y":2,"angle":0.5,"timestamp":990}]}"#,
        )
        .unwrap();
        let ServerMessage::Entities { time, entities } = msg else {
            panic!("wrong variant");
        };
        assert_eq!(time, 1000.0);
        assert_eq!(entities[0].id, EntityId::from("a"));
        assert_eq!((entities[0].x, entities[0].y), (1.5, 2.0));
        assert_eq!(entities[0].timestamp, 990.0);
    }

    #[test]
    fn malformed_numbers_become_zero() {
        let msg = ServerMessage::parse(
            r#"{"type":"entities","time":"soon","entities":[{"id":7,"x":null,"y":"12.5","angle":{}}]}"#,
        )
        .unwrap();
        let ServerMessage::Entities { time, entities } = msg else {
            panic!("wrong variant");
        };
        assert_eq!(time, 0.0);
        let e = &entities[0];
        assert_eq!(e.id, EntityId::from("7"));
        assert_eq!((e.x, e.y, e.angle, e.timestamp), (0.0, 12.5, 0.0, 0.0));
    }

    #[test]
    fn huge_values_clamp_to_zero() {
        let msg = ServerMessage::parse(r#"{"type":"object_spawn","object":{"id":"o","type":"tree","x":1e300,"y":3}}"#)
            .unwrap();
        let ServerMessage::ObjectSpawn { object } = msg else {
            panic!("wrong variant");
        };
        assert_eq!(object.def_id, "tree");
        assert_eq!((object.x, object.y), (0.0, 3.0));
    }

    #[test]
    fn object_messages() {
        let despawn = ServerMessage::parse(r#"{"type":"object_despawn","id":"o1"}"#).unwrap();
        assert_eq!(despawn, ServerMessage::ObjectDespawn { id: "o1".into() });

        let snap = ServerMessage::parse(
            r#"{"type":"objects_snapshot","objects":[{"id":"a","def_id":"rock","x":1,"y":2},{"id":"b","defId":"torch"}]}"#,
        )
        .unwrap();
        let ServerMessage::ObjectsSnapshot { objects } = snap else {
            panic!("wrong variant");
        };
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[1].def_id, "torch");
        assert_eq!((objects[1].x, objects[1].y), (0.0, 0.0));
    }

    #[test]
    fn you_and_unknown_types() {
        assert_eq!(
            ServerMessage::parse(r#"{"type":"you","id":"p9"}"#).unwrap(),
            ServerMessage::You { id: "p9".into() }
        );
        assert!(ServerMessage::parse(r#"{"type":"chat","text":"hi"}"#).is_err());
        assert!(ServerMessage::parse("not json").is_err());
    }
}
