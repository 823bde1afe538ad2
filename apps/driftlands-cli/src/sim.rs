//! In-process stand-ins for the world server: island terrain chunks
//! delivered with latency, and an entity server emitting jittered snapshots.

use std::f32::consts::{FRAC_PI_2, TAU};

use driftlands_common::{ChunkCoord, hash2d, splitmix64, unit_f32};
use driftlands_input::MoveIntent;
use driftlands_stream::{FetchError, TileId, WorldMeta};
use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde_json::json;

/// Object definitions served to the client.
pub const CATALOG: &str = r##"[
    {"id": "tree", "sprite": "objects/tree.png", "size_px": [48, 64], "anchor_y": 0.95},
    {"id": "rock", "sprite": "objects/rock.png", "size_px": [24, 18], "collision": {"shape": "circle", "radius": 9}},
    {"id": "lantern", "frames": ["objects/lantern_0.png", "objects/lantern_1.png"], "frame_ms": 200,
     "size_px": [16, 32], "light": {"radius": 96, "color": "#ffb347", "intensity": 0.9}},
    {"id": "chest", "sprite": "objects/chest.png", "size_px": [24, 20], "usable": true}
]"##;

/// Procedural island: grass in the middle, a sand ring, water outside.
#[derive(Debug, Clone, Copy)]
pub struct IslandWorld {
    pub meta: WorldMeta,
    seed: u64,
}

impl IslandWorld {
    pub fn new(meta: WorldMeta, seed: u64) -> Self {
        Self { meta, seed }
    }

    pub fn tile(&self, x: i32, y: i32) -> TileId {
        let w = self.meta.width_tiles as f32;
        let h = self.meta.height_tiles as f32;
        let d = Vec2::new((x as f32 - w * 0.5) / (w * 0.5), (y as f32 - h * 0.5) / (h * 0.5)).length();
        let coarse = unit_f32(hash2d(x.div_euclid(6), y.div_euclid(6), self.seed)) * 0.18;
        let d = d + coarse;
        if d < 0.6 {
            if unit_f32(hash2d(x, y, splitmix64(self.seed))) < 0.04 {
                TileId::STONE
            } else {
                TileId::GRASS
            }
        } else if d < 0.7 {
            TileId::SAND
        } else {
            TileId::WATER
        }
    }

    pub fn chunk_bytes(&self, coord: ChunkCoord) -> Vec<u8> {
        let size = self.meta.chunk_size as i32;
        let mut bytes = Vec::with_capacity((size * size) as usize);
        for ly in 0..size {
            for lx in 0..size {
                bytes.push(self.tile(coord.x * size + lx, coord.y * size + ly).0);
            }
        }
        bytes
    }
}

/// Chunk endpoint with latency and occasional failures.
#[derive(Debug)]
pub struct ChunkServer {
    world: IslandWorld,
    rng: Pcg32,
    latency_ms: f64,
    fail_rate: f64,
    pending: Vec<(f64, ChunkCoord)>,
    pub served: u64,
    pub failed: u64,
}

impl ChunkServer {
    pub fn new(world: IslandWorld, seed: u64, latency_ms: f64, fail_rate: f64) -> Self {
        Self {
            world,
            rng: Pcg32::seed_from_u64(splitmix64(seed ^ 0x6368_756e)),
            latency_ms,
            fail_rate: fail_rate.clamp(0.0, 1.0),
            pending: Vec::new(),
            served: 0,
            failed: 0,
        }
    }

    pub fn request(&mut self, coord: ChunkCoord, now_ms: f64) {
        let due = now_ms + self.latency_ms * self.rng.random_range(0.5f64..1.5);
        self.pending.push((due, coord));
    }

    /// Completions due by `now_ms`.
    pub fn poll(&mut self, now_ms: f64) -> Vec<(ChunkCoord, Result<Vec<u8>, FetchError>)> {
        let (due, waiting): (Vec<_>, Vec<_>) = self.pending.drain(..).partition(|(at, _)| *at <= now_ms);
        self.pending = waiting;
        due.into_iter()
            .map(|(_, coord)| {
                if self.rng.random_bool(self.fail_rate) {
                    self.failed += 1;
                    (coord, Err(FetchError::Status(503)))
                } else {
                    self.served += 1;
                    (coord, Ok(self.world.chunk_bytes(coord)))
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
struct Bot {
    id: String,
    center: Vec2,
    radius: f32,
    /// Radians per second; negative circles the other way.
    rate: f32,
    phase: f32,
}

impl Bot {
    fn position(&self, t: f32) -> Vec2 {
        let a = self.phase + self.rate * t;
        self.center + Vec2::new(a.cos(), a.sin()) * self.radius
    }

    fn heading(&self, t: f32) -> f32 {
        let a = self.phase + self.rate * t;
        a + FRAC_PI_2 * self.rate.signum()
    }
}

/// Authoritative entity server for the local player and a crowd of bots.
///
/// Snapshots are stamped with server time (offset from the local clock)
/// and delivered with random jitter, so they can arrive out of order.
#[derive(Debug)]
pub struct EntityServer {
    rng: Pcg32,
    bots: Vec<Bot>,
    player: Vec2,
    player_target: Vec2,
    player_speed: f32,
    tick_ms: f64,
    next_tick_ms: f64,
    jitter_ms: f64,
    epoch_ms: f64,
    outbox: Vec<(f64, String)>,
    pub sent: u64,
}

impl EntityServer {
    pub fn new(seed: u64, bots: usize, spawn: Vec2) -> Self {
        let mut rng = Pcg32::seed_from_u64(splitmix64(seed ^ 0x626f_7473));
        let bots = (0..bots)
            .map(|i| Bot {
                id: format!("bot-{i}"),
                center: spawn + Vec2::new(rng.random_range(-400.0..400.0), rng.random_range(-300.0..300.0)),
                radius: rng.random_range(40.0..160.0),
                rate: rng.random_range(0.3f32..1.2) * if rng.random_bool(0.5) { 1.0 } else { -1.0 },
                phase: rng.random_range(0.0..TAU),
            })
            .collect();
        let objects: Vec<_> = (0..12)
            .map(|i| {
                let kind = ["tree", "rock", "lantern", "chest"][i % 4];
                let at = spawn + Vec2::new(rng.random_range(-500.0..500.0), rng.random_range(-350.0..350.0));
                json!({"id": format!("obj-{i}"), "type": kind, "x": at.x, "y": at.y})
            })
            .collect();

        let mut server = Self {
            rng,
            bots,
            player: spawn,
            player_target: spawn,
            player_speed: 180.0,
            tick_ms: 100.0,
            next_tick_ms: 0.0,
            jitter_ms: 40.0,
            epoch_ms: 1.0e9,
            outbox: Vec::new(),
            sent: 0,
        };
        server.outbox.push((0.0, json!({"type": "you", "id": "player"}).to_string()));
        server
            .outbox
            .push((0.0, json!({"type": "objects_snapshot", "objects": objects}).to_string()));
        server
    }

    pub fn player(&self) -> Vec2 {
        self.player
    }

    pub fn move_intent(&mut self, intent: MoveIntent) {
        self.player_target = intent.world();
    }

    /// Messages delivered by `now_ms`, in arrival order.
    pub fn poll(&mut self, now_ms: f64) -> Vec<String> {
        while self.next_tick_ms <= now_ms {
            let t = self.next_tick_ms;
            self.step_player((self.tick_ms / 1000.0) as f32);
            let snapshot = self.snapshot(t);
            let due = t + self.rng.random_range(0.0..self.jitter_ms.max(1.0));
            self.outbox.push((due, snapshot));
            self.next_tick_ms += self.tick_ms;
        }

        let (mut due, waiting): (Vec<_>, Vec<_>) = self.outbox.drain(..).partition(|(at, _)| *at <= now_ms);
        self.outbox = waiting;
        due.sort_by(|a, b| a.0.total_cmp(&b.0));
        self.sent += due.len() as u64;
        due.into_iter().map(|(_, msg)| msg).collect()
    }

    fn step_player(&mut self, dt: f32) {
        let delta = self.player_target - self.player;
        let step = self.player_speed * dt;
        if delta.length() <= step {
            self.player = self.player_target;
        } else {
            self.player += delta.normalize() * step;
        }
    }

    fn snapshot(&self, local_ms: f64) -> String {
        let server_ms = local_ms + self.epoch_ms;
        let t = (local_ms / 1000.0) as f32;
        let mut entities: Vec<_> = self
            .bots
            .iter()
            .map(|bot| {
                let p = bot.position(t);
                json!({"id": bot.id, "x": p.x, "y": p.y, "angle": bot.heading(t), "timestamp": server_ms})
            })
            .collect();
        entities.push(json!({"id": "player", "x": self.player.x, "y": self.player.y, "timestamp": server_ms}));
        json!({"type": "entities", "time": server_ms, "entities": entities}).to_string()
    }
}
