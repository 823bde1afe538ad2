use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use driftlands_common::Viewport;
use glam::Vec2;

use crate::clock::FrameClock;

/// Everything a subsystem may read about the current frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameContext {
    pub frame_index: u64,
    pub now_ms: f64,
    /// Milliseconds since the first composed frame.
    pub elapsed_ms: f64,
    /// Clamped seconds since the previous frame.
    pub dt: f32,
    pub viewport: Viewport,
    /// Smoothed camera focus; equals `viewport.center`.
    pub camera: Vec2,
}

impl FrameContext {
    /// Animation time in seconds, rebased to the first frame so large host
    /// clocks keep sub-millisecond precision in `f32`.
    pub fn time_s(&self) -> f32 {
        (self.elapsed_ms / 1000.0) as f32
    }
}

/// One refresh delivered by a [`FrameLoop`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTick {
    pub frame_index: u64,
    pub now_ms: f64,
    pub dt: f32,
}

/// Source of display refresh timestamps (milliseconds).
///
/// Hosts back this with their vsync callback; `None` means the surface is
/// gone and the loop should stop.
pub trait RefreshSource {
    fn next_refresh(&mut self) -> Option<f64>;
}

/// Fixed-interval refresh for headless runs and tests.
#[derive(Debug, Clone)]
pub struct FixedRefresh {
    interval_ms: f64,
    next_ms: f64,
    remaining: Option<u64>,
}

impl FixedRefresh {
    pub fn new(interval_ms: f64) -> Self {
        Self {
            interval_ms,
            next_ms: 0.0,
            remaining: None,
        }
    }

    pub fn starting_at(mut self, start_ms: f64) -> Self {
        self.next_ms = start_ms;
        self
    }

    /// Stop after `frames` refreshes.
    pub fn limit(mut self, frames: u64) -> Self {
        self.remaining = Some(frames);
        self
    }
}

impl RefreshSource for FixedRefresh {
    fn next_refresh(&mut self) -> Option<f64> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return None;
            }
            *remaining -= 1;
        }
        let now = self.next_ms;
        self.next_ms += self.interval_ms;
        Some(now)
    }
}

/// Stops a running [`FrameLoop`] from anywhere (teardown, unmount).
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Drives one callback per refresh with a clamped delta time.
#[derive(Debug)]
pub struct FrameLoop<S> {
    source: S,
    clock: FrameClock,
    cancel: CancelHandle,
    frame_index: u64,
}

impl<S: RefreshSource> FrameLoop<S> {
    pub fn new(source: S, max_dt: f32) -> Self {
        Self {
            source,
            clock: FrameClock::new(max_dt),
            cancel: CancelHandle::default(),
            frame_index: 0,
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn frames(&self) -> u64 {
        self.frame_index
    }

    /// Run until the callback breaks, the source ends or the loop is
    /// cancelled. Returns the number of frames delivered by this call.
    pub fn run<F>(&mut self, mut on_frame: F) -> u64
    where
        F: FnMut(FrameTick) -> ControlFlow<()>,
    {
        let start = self.frame_index;
        while !self.cancel.is_cancelled() {
            let Some(now_ms) = self.source.next_refresh() else {
                tracing::debug!("refresh source ended");
                break;
            };
            let tick = FrameTick {
                frame_index: self.frame_index,
                now_ms,
                dt: self.clock.tick(now_ms),
            };
            self.frame_index += 1;
            if on_frame(tick).is_break() {
                break;
            }
        }
        self.frame_index - start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_refresh_counts_down() {
        let mut src = FixedRefresh::new(10.0).starting_at(100.0).limit(2);
        assert_eq!(src.next_refresh(), Some(100.0));
        assert_eq!(src.next_refresh(), Some(110.0));
        assert_eq!(src.next_refresh(), None);
    }

    #[test]
    fn loop_runs_until_source_ends() {
        let mut lp = FrameLoop::new(FixedRefresh::new(16.0).limit(5), 0.1);
        let mut dts = Vec::new();
        let frames = lp.run(|tick| {
            dts.push(tick.dt);
            ControlFlow::Continue(())
        });
        assert_eq!(frames, 5);
        assert_eq!(dts[0], 0.0);
        assert!((dts[1] - 0.016).abs() < 1e-6);
    }

    #[test]
    fn callback_can_break() {
        let mut lp = FrameLoop::new(FixedRefresh::new(16.0), 0.1);
        let frames = lp.run(|tick| {
            if tick.frame_index == 2 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        assert_eq!(frames, 3);
    }

    #[test]
    fn cancel_handle_stops_loop() {
        let mut lp = FrameLoop::new(FixedRefresh::new(16.0), 0.1);
        let cancel = lp.cancel_handle();
        let frames = lp.run(|tick| {
            if tick.frame_index == 9 {
                cancel.cancel();
            }
            ControlFlow::Continue(())
        });
        assert_eq!(frames, 10);
        // a cancelled loop delivers nothing more
        assert_eq!(lp.run(|_| ControlFlow::Continue(())), 0);
    }

    #[test]
    fn long_gap_is_clamped() {
        struct Stall(Vec<f64>);
        impl RefreshSource for Stall {
            fn next_refresh(&mut self) -> Option<f64> {
                if self.0.is_empty() { None } else { Some(self.0.remove(0)) }
            }
        }
        let mut lp = FrameLoop::new(Stall(vec![0.0, 16.0, 5000.0]), 0.1);
        let mut last = 0.0;
        lp.run(|tick| {
            last = tick.dt;
            ControlFlow::Continue(())
        });
        assert_eq!(last, 0.1);
    }
}
