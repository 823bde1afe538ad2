//! Client core: frame scheduling, boot orchestration and per-frame
//! composition of backdrop, terrain and sprites.
//!
//! # Invariants
//! - One draw list per refresh; nothing in the frame path returns an error.
//! - Delta time is clamped, so a stall never turns into a catch-up burst.
//! - Boot is ready only when every step is done; a failed step is sticky
//!   and never touches another step.
//! - Deferred initialization starts only after two painted frames and is
//!   bounded by a watchdog.

mod boot;
mod client;
mod clock;
mod config;
mod deferred;
mod frame;
mod nebula;
mod stats;

pub use boot::{BootTracker, STEP_DUST, STEP_NEBULA, STEP_STARS, STEP_TERRAIN, StepStatus};
pub use client::{Client, Frame};
pub use clock::{CameraState, FrameClock};
pub use config::{CacheConfig, ClientConfig, ConfigError, FrameConfig};
pub use deferred::{DeferredConfig, DeferredInit, InitSender, Launcher};
pub use frame::{CancelHandle, FixedRefresh, FrameContext, FrameLoop, FrameTick, RefreshSource};
pub use nebula::{bake_all, inline_launcher, nebula_seeds, thread_launcher};
pub use stats::{FrameSample, FrameStats};

/// Errors that stop the client from starting.
#[derive(Debug, thiserror::Error)]
pub enum BootError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("world error: {0}")]
    World(#[from] driftlands_stream::StreamError),
    #[error("backdrop error: {0}")]
    Backdrop(#[from] driftlands_backdrop::BackdropError),
}

pub fn crate_info() -> &'static str {
    "driftlands-client v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("client"));
    }
}
