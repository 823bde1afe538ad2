use serde::Deserialize;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

use crate::boot::BootTracker;

/// Sender half handed to a launcher. The launcher reports exactly once.
pub type InitSender<T> = oneshot::Sender<Result<T, String>>;

/// Host hook that starts the heavy work, on a thread or inline.
pub type Launcher<T> = Box<dyn FnOnce(InitSender<T>) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct DeferredConfig {
    /// Frames painted before the launcher runs, so the loading overlay is
    /// on screen before any blocking work starts.
    pub paint_frames: u32,
    /// Time after launch before the step is forced terminal.
    pub watchdog_ms: f64,
}

impl Default for DeferredConfig {
    fn default() -> Self {
        Self {
            paint_frames: 2,
            watchdog_ms: 8000.0,
        }
    }
}

enum Phase<T> {
    Waiting { painted: u32, launcher: Launcher<T> },
    Running { rx: oneshot::Receiver<Result<T, String>>, launched_ms: f64 },
    Finished,
}

/// Optional subsystem initialized after first paint.
///
/// Polled once per painted frame. Outcomes land on the named boot step:
/// a value marks it done, an error or a dropped sender marks it errored, and
/// the watchdog forces it done (the subsystem stays absent) if the launcher
/// never answers.
pub struct DeferredInit<T> {
    step: String,
    config: DeferredConfig,
    phase: Phase<T>,
}

impl<T> std::fmt::Debug for DeferredInit<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let phase = match &self.phase {
            Phase::Waiting { painted, .. } => format!("waiting({painted})"),
            Phase::Running { launched_ms, .. } => format!("running(since {launched_ms})"),
            Phase::Finished => "finished".to_string(),
        };
        f.debug_struct("DeferredInit")
            .field("step", &self.step)
            .field("config", &self.config)
            .field("phase", &phase)
            .finish()
    }
}

impl<T> DeferredInit<T> {
    pub fn new(step: impl Into<String>, config: DeferredConfig, launcher: Launcher<T>) -> Self {
        Self {
            step: step.into(),
            config,
            phase: Phase::Waiting {
                painted: 0,
                launcher,
            },
        }
    }

    pub fn step(&self) -> &str {
        &self.step
    }

    pub fn is_launched(&self) -> bool {
        !matches!(self.phase, Phase::Waiting { .. })
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Finished)
    }

    /// Call once after each painted frame. Never blocks.
    ///
    /// Returns the value on the frame it arrives.
    pub fn poll(&mut self, now_ms: f64, boot: &mut BootTracker) -> Option<T> {
        if let Phase::Waiting { painted, .. } = &mut self.phase {
            *painted += 1;
            if *painted < self.config.paint_frames {
                return None;
            }
            self.launch(now_ms, boot);
        }

        let Phase::Running { rx, launched_ms } = &mut self.phase else {
            return None;
        };
        let launched_ms = *launched_ms;
        match rx.try_recv() {
            Ok(Ok(value)) => {
                boot.done(&self.step);
                self.phase = Phase::Finished;
                Some(value)
            }
            Ok(Err(note)) => {
                boot.error(&self.step, note);
                self.phase = Phase::Finished;
                None
            }
            Err(TryRecvError::Closed) => {
                boot.error(&self.step, "loader dropped");
                self.phase = Phase::Finished;
                None
            }
            Err(TryRecvError::Empty) => {
                if now_ms - launched_ms >= self.config.watchdog_ms {
                    tracing::warn!(
                        step = %self.step,
                        waited_ms = now_ms - launched_ms,
                        "watchdog fired, continuing without deferred subsystem"
                    );
                    boot.done(&self.step);
                    self.phase = Phase::Finished;
                }
                None
            }
        }
    }

    fn launch(&mut self, now_ms: f64, boot: &mut BootTracker) {
        let phase = std::mem::replace(&mut self.phase, Phase::Finished);
        if let Phase::Waiting { launcher, .. } = phase {
            let (tx, rx) = oneshot::channel();
            boot.start(&self.step);
            tracing::debug!(step = %self.step, "launching deferred init");
            launcher(tx);
            self.phase = Phase::Running {
                rx,
                launched_ms: now_ms,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::boot::StepStatus;

    fn boot() -> BootTracker {
        let mut boot = BootTracker::new();
        boot.begin(["nebula"]);
        boot
    }

    #[test]
    fn launches_after_two_paints() {
        let parked = Arc::new(Mutex::new(None));
        let slot = parked.clone();
        let mut init = DeferredInit::new(
            "nebula",
            DeferredConfig::default(),
            Box::new(move |tx: InitSender<u32>| {
                *slot.lock().unwrap() = Some(tx);
            }),
        );
        let mut boot = boot();
        assert_eq!(init.poll(0.0, &mut boot), None);
        assert!(!init.is_launched());
        assert_eq!(boot.status("nebula"), Some(&StepStatus::Idle));

        init.poll(16.0, &mut boot);
        assert!(init.is_launched());
        assert!(parked.lock().unwrap().is_some());
        assert_eq!(boot.status("nebula"), Some(&StepStatus::Working));
    }

    #[test]
    fn inline_value_finishes_step() {
        let mut init = DeferredInit::new(
            "nebula",
            DeferredConfig::default(),
            Box::new(|tx: InitSender<u32>| {
                let _ = tx.send(Ok(7));
            }),
        );
        let mut boot = boot();
        assert_eq!(init.poll(0.0, &mut boot), None);
        assert_eq!(init.poll(16.0, &mut boot), Some(7));
        assert!(init.is_finished());
        assert!(boot.ready());
    }

    #[test]
    fn error_marks_step_errored() {
        let mut init = DeferredInit::new(
            "nebula",
            DeferredConfig {
                paint_frames: 0,
                ..DeferredConfig::default()
            },
            Box::new(|tx: InitSender<u32>| {
                let _ = tx.send(Err("bake failed".into()));
            }),
        );
        let mut boot = boot();
        assert_eq!(init.poll(0.0, &mut boot), None);
        assert_eq!(boot.status("nebula"), Some(&StepStatus::Error("bake failed".into())));
        assert!(boot.has_error());
    }

    #[test]
    fn dropped_sender_is_an_error() {
        let mut init = DeferredInit::new(
            "nebula",
            DeferredConfig {
                paint_frames: 1,
                ..DeferredConfig::default()
            },
            Box::new(|tx: InitSender<u32>| drop(tx)),
        );
        let mut boot = boot();
        init.poll(0.0, &mut boot);
        assert_eq!(boot.status("nebula"), Some(&StepStatus::Error("loader dropped".into())));
    }

    #[test]
    fn watchdog_forces_done() {
        let parked = Arc::new(Mutex::new(None));
        let slot = parked.clone();
        let mut init = DeferredInit::new(
            "nebula",
            DeferredConfig {
                paint_frames: 1,
                watchdog_ms: 8000.0,
            },
            Box::new(move |tx: InitSender<u32>| {
                *slot.lock().unwrap() = Some(tx);
            }),
        );
        let mut boot = boot();
        init.poll(1000.0, &mut boot);
        init.poll(8999.0, &mut boot);
        assert_eq!(boot.status("nebula"), Some(&StepStatus::Working));
        init.poll(9000.0, &mut boot);
        assert!(init.is_finished());
        assert!(boot.ready());

        // a late answer has nowhere to go
        let tx = parked.lock().unwrap().take().unwrap();
        assert!(tx.send(Ok(1)).is_err());
    }
}
