//! Debounced save scheduling
//!
//! Every mutation calls [`SaveScheduler::trigger`]; the save itself only runs
//! once the settings have been left alone for a full quiet period. The event
//! loop asks for [`SaveScheduler::deadline`] to size its poll timeout and calls
//! [`SaveScheduler::poll`] when it wakes up. Time is passed in explicitly so the
//! state machine never reads a clock on its own.

use std::time::{Duration, Instant};

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    /// Nothing to write
    Idle,
    /// A save is due at `deadline` unless another trigger pushes it back
    Pending { deadline: Instant },
    /// The save callback is running
    Flushing,
}

#[derive(Debug)]
pub struct SaveScheduler {
    quiet: Duration,
    state: SaveState,
}

impl SaveScheduler {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            state: SaveState::Idle,
        }
    }

    pub fn state(&self) -> SaveState {
        self.state
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, SaveState::Pending { .. })
    }

    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            SaveState::Pending { deadline } => Some(deadline),
            _ => None,
        }
    }

    /// Arm (or re-arm) the timer for a full quiet period starting at `now`.
    ///
    /// A trigger while flushing schedules a fresh save for the changes made
    /// after the running one captured its snapshot.
    pub fn trigger(&mut self, now: Instant) {
        let deadline = now + self.quiet;
        if let SaveState::Pending { .. } = self.state {
            debug!(quiet_ms = self.quiet.as_millis() as u64, "Save timer restarted");
        } else {
            debug!(quiet_ms = self.quiet.as_millis() as u64, "Save scheduled");
        }
        self.state = SaveState::Pending { deadline };
    }

    /// Drop a pending save without running it
    pub fn cancel(&mut self) {
        if self.is_pending() {
            debug!("Pending save cancelled");
            self.state = SaveState::Idle;
        }
    }

    pub fn due(&self, now: Instant) -> bool {
        matches!(self.state, SaveState::Pending { deadline } if now >= deadline)
    }

    /// Move Pending -> Flushing when the deadline has passed
    pub fn begin_flush(&mut self, now: Instant) -> bool {
        if self.due(now) {
            self.state = SaveState::Flushing;
            true
        } else {
            false
        }
    }

    /// Move Flushing -> Idle; a trigger that arrived meanwhile stays pending
    pub fn finish_flush(&mut self) {
        if self.state == SaveState::Flushing {
            self.state = SaveState::Idle;
        }
    }

    /// Run `save` if the quiet period has elapsed.
    ///
    /// Returns `None` when nothing was due. A failed save still returns the
    /// scheduler to Idle; the next trigger retries.
    pub fn poll<E>(
        &mut self,
        now: Instant,
        save: impl FnOnce() -> Result<(), E>,
    ) -> Option<Result<(), E>> {
        if !self.begin_flush(now) {
            return None;
        }
        let result = save();
        self.finish_flush();
        Some(result)
    }

    /// Run `save` right away if anything is pending (shutdown path)
    pub fn flush<E>(&mut self, save: impl FnOnce() -> Result<(), E>) -> Option<Result<(), E>> {
        if !self.is_pending() {
            return None;
        }
        self.state = SaveState::Flushing;
        let result = save();
        self.finish_flush();
        Some(result)
    }
}
