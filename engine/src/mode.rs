//! Session mode: an explicit state machine replacing ad-hoc re-entrancy
//! flags.
//!
//! DESIGN
//! ======
//! The session is in exactly one of three modes. Transitions out of
//! `Idle` must go through the checked `begin_*` methods, so overlapping
//! "applying remote" and "restoring history" phases are unrepresentable.
//! These guards are session-local booleans in spirit: they prevent local
//! feedback loops, never cross-session write races.

/// What the session is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Accepting local mutations and remote change notifications.
    #[default]
    Idle,
    /// Loading an incoming remote document; local writes are suppressed
    /// until the settling delay elapses.
    ApplyingRemote,
    /// Loading an undo/redo snapshot; history commits are suppressed.
    RestoringHistory,
}

/// Rejected transition: the session was not `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ModeError {
    #[error("session is applying a remote update")]
    ApplyingRemote,
    #[error("session is restoring history")]
    RestoringHistory,
}

impl Mode {
    #[must_use]
    pub fn is_idle(self) -> bool {
        self == Mode::Idle
    }

    fn busy_error(self) -> ModeError {
        match self {
            Mode::ApplyingRemote => ModeError::ApplyingRemote,
            // `Idle` never reaches here; callers check before mapping.
            Mode::Idle | Mode::RestoringHistory => ModeError::RestoringHistory,
        }
    }

    /// Enter `ApplyingRemote`. Fails unless currently `Idle`.
    ///
    /// # Errors
    ///
    /// Returns the busy mode when a transition is already in progress.
    pub fn begin_applying_remote(&mut self) -> Result<(), ModeError> {
        self.begin(Mode::ApplyingRemote)
    }

    /// Enter `RestoringHistory`. Fails unless currently `Idle`.
    ///
    /// # Errors
    ///
    /// Returns the busy mode when a transition is already in progress.
    pub fn begin_restoring_history(&mut self) -> Result<(), ModeError> {
        self.begin(Mode::RestoringHistory)
    }

    fn begin(&mut self, next: Mode) -> Result<(), ModeError> {
        if !self.is_idle() {
            return Err(self.busy_error());
        }
        *self = next;
        Ok(())
    }

    /// Return to `Idle`. Safe to call from any mode.
    pub fn finish(&mut self) {
        *self = Mode::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_accepts_either_transition() {
        let mut mode = Mode::default();
        assert!(mode.is_idle());
        assert!(mode.begin_applying_remote().is_ok());
        assert_eq!(mode, Mode::ApplyingRemote);

        mode.finish();
        assert!(mode.begin_restoring_history().is_ok());
        assert_eq!(mode, Mode::RestoringHistory);
    }

    #[test]
    fn overlapping_transitions_are_rejected() {
        let mut mode = Mode::Idle;
        mode.begin_applying_remote().unwrap();
        assert_eq!(mode.begin_applying_remote(), Err(ModeError::ApplyingRemote));
        assert_eq!(mode.begin_restoring_history(), Err(ModeError::ApplyingRemote));

        mode.finish();
        mode.begin_restoring_history().unwrap();
        assert_eq!(mode.begin_applying_remote(), Err(ModeError::RestoringHistory));
    }

    #[test]
    fn finish_always_returns_to_idle() {
        let mut mode = Mode::Idle;
        mode.finish();
        assert!(mode.is_idle());

        mode.begin_applying_remote().unwrap();
        mode.finish();
        assert!(mode.is_idle());
    }
}
