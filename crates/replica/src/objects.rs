use std::collections::BTreeMap;

use driftlands_common::EntityId;
use glam::Vec2;

use crate::protocol::ObjectWire;

/// A world object known to the client.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectInstance {
    pub id: EntityId,
    pub def_id: String,
    pub position: Vec2,
}

impl From<ObjectWire> for ObjectInstance {
    fn from(wire: ObjectWire) -> Self {
        Self {
            id: wire.id,
            def_id: wire.def_id,
            position: Vec2::new(wire.x, wire.y),
        }
    }
}

/// Client mirror of server world objects.
///
/// Mutated only by spawn, despawn and snapshot messages. Uses BTreeMap so
/// iteration order is the same on every run.
#[derive(Debug, Clone, Default)]
pub struct ObjectMirror {
    objects: BTreeMap<EntityId, ObjectInstance>,
    version: u64,
}

impl ObjectMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or update an object in place.
    pub fn spawn(&mut self, object: ObjectInstance) {
        match self.objects.get_mut(&object.id) {
            Some(existing) => *existing = object,
            None => {
                self.objects.insert(object.id.clone(), object);
            }
        }
        self.version += 1;
    }

    pub fn despawn(&mut self, id: &EntityId) -> Option<ObjectInstance> {
        let removed = self.objects.remove(id);
        if removed.is_some() {
            self.version += 1;
        } else {
            tracing::debug!(%id, "despawn for unknown object");
        }
        removed
    }

    /// Replace the whole set with a snapshot.
    pub fn replace_all(&mut self, objects: impl IntoIterator<Item = ObjectInstance>) {
        self.objects = objects.into_iter().map(|o| (o.id.clone(), o)).collect();
        self.version += 1;
    }

    pub fn get(&self, id: &EntityId) -> Option<&ObjectInstance> {
        self.objects.get(id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ObjectInstance> {
        self.objects.values()
    }

    /// Bumped by every mutation.
    pub fn version(&self) -> u64 {
        self.version
    }
}
