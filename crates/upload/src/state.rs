//! Lifecycle of a single upload.

use std::fmt;

use crate::error::UploadError;

/// Phase of one upload.
///
/// `Idle → SessionRequested → SessionOpen → Transmitting(offset) → … →
/// Completed`, or `Failed` from any non-terminal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPhase {
    Idle,
    SessionRequested,
    SessionOpen,
    /// Bytes `[0, offset)` are acknowledged.
    Transmitting { offset: u64 },
    Completed,
    Failed,
}

impl UploadPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    fn allows(self, next: Self) -> bool {
        use UploadPhase::*;
        match (self, next) {
            (Completed | Failed, _) => false,
            (_, Failed) => true,
            (Idle, SessionRequested) => true,
            (SessionRequested, SessionOpen) => true,
            (SessionOpen, Transmitting { offset }) => offset > 0,
            (Transmitting { offset: prev }, Transmitting { offset }) => offset > prev,
            (SessionOpen | Transmitting { .. }, Completed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for UploadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::SessionRequested => f.write_str("session requested"),
            Self::SessionOpen => f.write_str("session open"),
            Self::Transmitting { offset } => write!(f, "transmitting at {offset}"),
            Self::Completed => f.write_str("completed"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

/// Enforces the legal phase transitions of one upload.
#[derive(Debug, Clone)]
pub struct UploadState {
    phase: UploadPhase,
}

impl Default for UploadState {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadState {
    pub fn new() -> Self {
        Self {
            phase: UploadPhase::Idle,
        }
    }

    /// State for a caller that already holds a session.
    pub fn with_open_session() -> Self {
        Self {
            phase: UploadPhase::SessionOpen,
        }
    }

    pub fn phase(&self) -> UploadPhase {
        self.phase
    }

    /// Moves to `next`, or refuses if the transition is illegal.
    pub fn advance(&mut self, next: UploadPhase) -> Result<(), UploadError> {
        if !self.phase.allows(next) {
            return Err(UploadError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        self.phase = next;
        Ok(())
    }

    /// Records a failure. A terminal phase is left untouched.
    pub fn fail(&mut self) {
        if !self.phase.is_terminal() {
            self.phase = UploadPhase::Failed;
        }
    }
}
