use std::collections::{BTreeMap, VecDeque};

use driftlands_common::{EntityId, RenderPose, lerp_angle};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct InterpolationConfig {
    /// Render this far behind the newest known time.
    pub interp_delay_ms: f64,
    /// History kept per entity, measured back from its newest sample.
    pub history_ms: f64,
    /// Longest time a pose is extrapolated past the newest sample.
    pub max_extrapolation_ms: f64,
}

impl Default for InterpolationConfig {
    fn default() -> Self {
        Self {
            interp_delay_ms: 120.0,
            history_ms: 2000.0,
            max_extrapolation_ms: 140.0,
        }
    }
}

/// One authoritative sample of a remote entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    pub timestamp_ms: f64,
    pub x: f32,
    pub y: f32,
    pub heading: f32,
}

impl Snapshot {
    pub fn new(timestamp_ms: f64, x: f32, y: f32, heading: f32) -> Self {
        Self {
            timestamp_ms,
            x,
            y,
            heading,
        }
    }
}

/// Time-ordered history of one entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotBuffer {
    samples: VecDeque<Snapshot>,
}

impl SnapshotBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample if it is strictly newer than the newest one, then
    /// drop samples older than `history_ms` before it. Returns whether the
    /// sample was kept.
    pub fn push(&mut self, sample: Snapshot, history_ms: f64) -> bool {
        if !sample.timestamp_ms.is_finite() {
            return false;
        }
        if let Some(last) = self.samples.back() {
            if sample.timestamp_ms <= last.timestamp_ms {
                return false;
            }
        }
        self.samples.push_back(sample);
        let horizon = sample.timestamp_ms - history_ms;
        while self.samples.len() > 1 && self.samples.front().is_some_and(|s| s.timestamp_ms < horizon) {
            self.samples.pop_front();
        }
        true
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn newest(&self) -> Option<&Snapshot> {
        self.samples.back()
    }

    pub fn oldest(&self) -> Option<&Snapshot> {
        self.samples.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> {
        self.samples.iter()
    }

    /// Pose at `target_ms`: held before the oldest sample, interpolated
    /// between brackets, extrapolated (bounded) after the newest.
    pub fn sample(&self, target_ms: f64, max_extrapolation_ms: f64) -> Option<RenderPose> {
        let oldest = self.samples.front()?;
        let newest = self.samples.back()?;

        if target_ms <= oldest.timestamp_ms {
            return Some(pose(oldest));
        }
        if target_ms >= newest.timestamp_ms {
            let Some(prev) = self.samples.iter().rev().nth(1) else {
                return Some(pose(newest));
            };
            let span = newest.timestamp_ms - prev.timestamp_ms;
            let ahead = (target_ms - newest.timestamp_ms).min(max_extrapolation_ms.max(0.0));
            let vx = (newest.x - prev.x) as f64 / span;
            let vy = (newest.y - prev.y) as f64 / span;
            return Some(RenderPose::new(
                newest.x + (vx * ahead) as f32,
                newest.y + (vy * ahead) as f32,
                newest.heading,
            ));
        }

        // first sample strictly after the target; the one before brackets it
        let idx = self.samples.partition_point(|s| s.timestamp_ms <= target_ms);
        let (a, b) = (&self.samples[idx - 1], &self.samples[idx]);
        let t = ((target_ms - a.timestamp_ms) / (b.timestamp_ms - a.timestamp_ms)) as f32;
        Some(RenderPose::new(
            a.x + (b.x - a.x) * t,
            a.y + (b.y - a.y) * t,
            lerp_angle(a.heading, b.heading, t),
        ))
    }
}

fn pose(s: &Snapshot) -> RenderPose {
    RenderPose::new(s.x, s.y, s.heading)
}

/// Interpolated poses for every remote entity.
#[derive(Debug, Clone, Default)]
pub struct RemoteInterpolator {
    config: InterpolationConfig,
    buffers: BTreeMap<EntityId, SnapshotBuffer>,
}

impl RemoteInterpolator {
    pub fn new(config: InterpolationConfig) -> Self {
        Self {
            config,
            buffers: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &InterpolationConfig {
        &self.config
    }

    /// Record a sample. Stale or duplicate timestamps are rejected.
    pub fn push(&mut self, id: &EntityId, sample: Snapshot) -> bool {
        let history = self.config.history_ms;
        let kept = self.buffers.entry(id.clone()).or_default().push(sample, history);
        if !kept {
            tracing::trace!(%id, ts = sample.timestamp_ms, "stale snapshot rejected");
        }
        kept
    }

    /// Drop every entity not in `present`. A dropped id starts a fresh
    /// history if it comes back.
    pub fn retain_authoritative<'a>(&mut self, present: impl IntoIterator<Item = &'a EntityId>) {
        let keep: std::collections::BTreeSet<&EntityId> = present.into_iter().collect();
        self.buffers.retain(|id, _| keep.contains(id));
    }

    pub fn remove(&mut self, id: &EntityId) -> bool {
        self.buffers.remove(id).is_some()
    }

    pub fn buffer(&self, id: &EntityId) -> Option<&SnapshotBuffer> {
        self.buffers.get(id)
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Render target time for a clock reading.
    pub fn render_time(&self, now_ms: f64) -> f64 {
        now_ms - self.config.interp_delay_ms
    }

    pub fn pose(&self, id: &EntityId, now_ms: f64) -> Option<RenderPose> {
        self.buffers
            .get(id)?
            .sample(self.render_time(now_ms), self.config.max_extrapolation_ms)
    }

    /// Poses of all entities, in id order.
    pub fn poses(&self, now_ms: f64) -> impl Iterator<Item = (&EntityId, RenderPose)> {
        let target = self.render_time(now_ms);
        let max_extrapolation = self.config.max_extrapolation_ms;
        self.buffers
            .iter()
            .filter_map(move |(id, buf)| buf.sample(target, max_extrapolation).map(|p| (id, p)))
    }
}
