use std::fmt;

/// Boot step generating the starfield.
pub const STEP_STARS: &str = "stars";
/// Boot step generating the dust field.
pub const STEP_DUST: &str = "dust";
/// Deferred nebula bake.
pub const STEP_NEBULA: &str = "nebula";
/// Terrain under the camera streamed in.
pub const STEP_TERRAIN: &str = "terrain";

/// Status of one boot step.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StepStatus {
    #[default]
    Idle,
    Working,
    Done,
    Error(String),
}

impl StepStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error(_))
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Working => f.write_str("working"),
            Self::Done => f.write_str("done"),
            Self::Error(note) => write!(f, "error: {note}"),
        }
    }
}

/// Readiness state machine behind the loading overlay.
///
/// Steps are named and kept in registration order. Subsystems report
/// progress through [`start`](Self::start), [`done`](Self::done) and
/// [`error`](Self::error); terminal states are sticky, and a failing step
/// never touches any other.
#[derive(Debug, Clone, Default)]
pub struct BootTracker {
    active: bool,
    steps: Vec<(String, StepStatus)>,
}

impl BootTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Activate boot with a fresh set of steps, all idle.
    pub fn begin<I, S>(&mut self, steps: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.steps.clear();
        for name in steps {
            let name = name.into();
            if self.steps.iter().any(|(n, _)| *n == name) {
                tracing::warn!(step = %name, "duplicate boot step ignored");
                continue;
            }
            self.steps.push((name, StepStatus::Idle));
        }
        self.active = true;
        tracing::debug!(steps = self.steps.len(), "boot started");
    }

    pub fn start(&mut self, step: &str) -> bool {
        self.transition(step, StepStatus::Working)
    }

    pub fn done(&mut self, step: &str) -> bool {
        self.transition(step, StepStatus::Done)
    }

    pub fn error(&mut self, step: &str, note: impl Into<String>) -> bool {
        self.transition(step, StepStatus::Error(note.into()))
    }

    fn transition(&mut self, step: &str, next: StepStatus) -> bool {
        let Some((_, status)) = self.steps.iter_mut().find(|(name, _)| name == step) else {
            tracing::warn!(step, "unknown boot step");
            return false;
        };
        if status.is_terminal() {
            tracing::debug!(step, current = %status, requested = %next, "boot step already finished");
            return false;
        }
        match &next {
            StepStatus::Error(note) => tracing::warn!(step, note = %note, "boot step failed"),
            other => tracing::debug!(step, status = %other, "boot step"),
        }
        *status = next;
        true
    }

    /// Active and every step done.
    pub fn ready(&self) -> bool {
        self.active && self.steps.iter().all(|(_, s)| *s == StepStatus::Done)
    }

    pub fn has_error(&self) -> bool {
        self.steps.iter().any(|(_, s)| matches!(s, StepStatus::Error(_)))
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn status(&self, step: &str) -> Option<&StepStatus> {
        self.steps.iter().find(|(name, _)| name == step).map(|(_, s)| s)
    }

    /// `(done, total)`.
    pub fn progress(&self) -> (usize, usize) {
        let done = self.steps.iter().filter(|(_, s)| *s == StepStatus::Done).count();
        (done, self.steps.len())
    }

    pub fn steps(&self) -> impl Iterator<Item = (&str, &StepStatus)> {
        self.steps.iter().map(|(name, s)| (name.as_str(), s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> BootTracker {
        let mut boot = BootTracker::new();
        boot.begin([STEP_STARS, STEP_DUST, STEP_NEBULA]);
        boot
    }

    #[test]
    fn inactive_tracker_is_not_ready() {
        let boot = BootTracker::new();
        assert!(!boot.ready());
        assert_eq!(boot.progress(), (0, 0));
    }

    #[test]
    fn ready_once_every_step_is_done() {
        let mut boot = tracker();
        boot.done(STEP_STARS);
        boot.done(STEP_DUST);
        assert!(!boot.ready());
        boot.start(STEP_NEBULA);
        assert_eq!(boot.status(STEP_NEBULA), Some(&StepStatus::Working));
        boot.done(STEP_NEBULA);
        assert!(boot.ready());
        assert_eq!(boot.progress(), (3, 3));
    }

    #[test]
    fn failure_is_isolated() {
        let mut boot = tracker();
        boot.done(STEP_STARS);
        boot.done(STEP_DUST);
        boot.start(STEP_NEBULA);
        boot.error(STEP_NEBULA, "import failed");

        assert!(boot.has_error());
        assert!(!boot.ready());
        assert_eq!(boot.status(STEP_STARS), Some(&StepStatus::Done));
        assert_eq!(boot.status(STEP_DUST), Some(&StepStatus::Done));
        // errors are sticky
        assert!(!boot.done(STEP_NEBULA));
        assert!(!boot.ready());
    }

    #[test]
    fn done_is_terminal() {
        let mut boot = tracker();
        boot.done(STEP_STARS);
        assert!(!boot.start(STEP_STARS));
        assert!(!boot.error(STEP_STARS, "late"));
        assert_eq!(boot.status(STEP_STARS), Some(&StepStatus::Done));
    }

    #[test]
    fn unknown_steps_are_ignored() {
        let mut boot = tracker();
        assert!(!boot.done("audio"));
        assert_eq!(boot.status("audio"), None);
        assert_eq!(boot.progress(), (0, 3));
    }

    #[test]
    fn steps_keep_registration_order() {
        let boot = tracker();
        let names: Vec<_> = boot.steps().map(|(n, _)| n).collect();
        assert_eq!(names, vec![STEP_STARS, STEP_DUST, STEP_NEBULA]);
    }
}
