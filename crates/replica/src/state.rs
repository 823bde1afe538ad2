use driftlands_common::{EntityId, RenderPose};
use glam::Vec2;
use serde::Deserialize;

use crate::ProtocolError;
use crate::interpolator::{InterpolationConfig, RemoteInterpolator, Snapshot};
use crate::objects::{ObjectInstance, ObjectMirror};
use crate::prediction::{LocalPredictor, PredictionConfig};
use crate::protocol::{EntityUpdate, ServerMessage};

/// Maps server timestamps onto the local clock.
///
/// Tracks `local - server` at its lowest observed value (the least delayed
/// message) and lets it relax upward slowly so drift is followed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ServerClock {
    offset_ms: Option<f64>,
}

impl ServerClock {
    const RELAX: f64 = 0.02;

    pub fn observe(&mut self, server_ms: f64, local_ms: f64) {
        let sample = local_ms - server_ms;
        self.offset_ms = Some(match self.offset_ms {
            Some(offset) if sample >= offset => offset + (sample - offset) * Self::RELAX,
            _ => sample,
        });
    }

    pub fn offset_ms(&self) -> Option<f64> {
        self.offset_ms
    }

    /// Local time of a server timestamp; identity until synchronized.
    pub fn to_local(&self, server_ms: f64) -> f64 {
        server_ms + self.offset_ms.unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReplicaConfig {
    pub interpolation: InterpolationConfig,
    pub prediction: PredictionConfig,
}

/// Counters for instrumentation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplicaStats {
    pub messages: u64,
    pub malformed: u64,
    pub stale_samples: u64,
}

/// Everything the client knows about server state: remote entity
/// histories, the locally controlled entity and world objects.
#[derive(Debug, Clone, Default)]
pub struct ReplicaState {
    local_id: Option<EntityId>,
    interpolator: RemoteInterpolator,
    predictor: LocalPredictor,
    objects: ObjectMirror,
    clock: ServerClock,
    stats: ReplicaStats,
}

impl ReplicaState {
    pub fn new(config: ReplicaConfig) -> Self {
        Self {
            interpolator: RemoteInterpolator::new(config.interpolation),
            predictor: LocalPredictor::new(config.prediction),
            ..Self::default()
        }
    }

    /// Parse and apply one text frame. Malformed frames are logged, counted
    /// and otherwise ignored.
    pub fn apply_text(&mut self, text: &str, now_ms: f64) -> Result<(), ProtocolError> {
        match ServerMessage::parse(text) {
            Ok(msg) => {
                self.apply(msg, now_ms);
                Ok(())
            }
            Err(err) => {
                self.stats.malformed += 1;
                tracing::warn!(%err, "malformed server message");
                Err(err)
            }
        }
    }

    pub fn apply(&mut self, msg: ServerMessage, now_ms: f64) {
        self.stats.messages += 1;
        match msg {
            ServerMessage::Entities { time, entities } => self.apply_entities(time, &entities, now_ms),
            ServerMessage::ObjectSpawn { object } => self.objects.spawn(object.into()),
            ServerMessage::ObjectDespawn { id } => {
                self.objects.despawn(&id);
            }
            ServerMessage::ObjectsSnapshot { objects } => {
                self.objects.replace_all(objects.into_iter().map(ObjectInstance::from));
            }
            ServerMessage::You { id } => self.set_local_id(id),
        }
    }

    fn apply_entities(&mut self, time: f64, entities: &[EntityUpdate], now_ms: f64) {
        // without a frame time, sync on the first stamped entity
        let reference = if time > 0.0 {
            Some(time)
        } else {
            entities.iter().map(|e| e.timestamp).find(|ts| *ts > 0.0)
        };
        if let Some(server_ms) = reference {
            self.clock.observe(server_ms, now_ms);
        }
        for e in entities {
            if self.local_id.as_ref() == Some(&e.id) {
                self.predictor.set_server_position(Vec2::new(e.x, e.y));
                continue;
            }
            let server_ts = if e.timestamp > 0.0 { e.timestamp } else { time };
            let local_ts = if server_ts > 0.0 {
                self.clock.to_local(server_ts)
            } else {
                now_ms
            };
            if !self
                .interpolator
                .push(&e.id, Snapshot::new(local_ts, e.x, e.y, e.angle))
            {
                self.stats.stale_samples += 1;
            }
        }
        self.interpolator.retain_authoritative(entities.iter().map(|e| &e.id));
    }

    fn set_local_id(&mut self, id: EntityId) {
        if self.local_id.as_ref() == Some(&id) {
            return;
        }
        tracing::debug!(%id, "local entity assigned");
        self.interpolator.remove(&id);
        self.predictor.reset();
        self.local_id = Some(id);
    }

    /// Advance local prediction by `dt` seconds.
    pub fn step(&mut self, dt: f32) -> Option<Vec2> {
        self.predictor.step(dt)
    }

    pub fn local_id(&self) -> Option<&EntityId> {
        self.local_id.as_ref()
    }

    pub fn local_pose(&self) -> Option<RenderPose> {
        self.predictor.render_pose()
    }

    pub fn remote_poses(&self, now_ms: f64) -> impl Iterator<Item = (&EntityId, RenderPose)> {
        self.interpolator.poses(now_ms)
    }

    pub fn interpolator(&self) -> &RemoteInterpolator {
        &self.interpolator
    }

    pub fn predictor(&self) -> &LocalPredictor {
        &self.predictor
    }

    pub fn objects(&self) -> &ObjectMirror {
        &self.objects
    }

    pub fn clock(&self) -> &ServerClock {
        &self.clock
    }

    pub fn stats(&self) -> &ReplicaStats {
        &self.stats
    }
}
