//! Generation lifecycle state machine.
//!
//! ```text
//! Idle ──Generate──> Generating ──Succeeded──> Success
//!                        │                        │
//!                        └───Failed──> Error      │
//!                                        │        │
//!                   Generating <──Generate┴────────┘
//! ```
//!
//! `Generate` is rejected while generating, which is the single-flight guard
//! for generation.

use std::sync::{Mutex, MutexGuard};

/// Events that can trigger status transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum SessionEvent {
    /// A generation request is about to be sent
    Generate,
    /// The backend returned an image
    Succeeded,
    /// The request failed
    Failed,
}

/// Lifecycle status of the session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum::Display)]
pub enum SessionStatus {
    #[default]
    Idle,
    Generating,
    Success,
    Error,
}

impl SessionStatus {
    pub fn is_generating(self) -> bool {
        self == Self::Generating
    }
}

/// Result of a successful state transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionResult {
    Changed {
        from: SessionStatus,
        to: SessionStatus,
    },
    /// Event was valid but status didn't change
    Unchanged,
}

/// Reason a transition was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{attempted_event} event rejected in {current_state} state")]
pub struct TransitionRejection {
    pub current_state: SessionStatus,
    pub attempted_event: SessionEvent,
}

/// Thread-safe session status manager
#[derive(Debug, Default)]
pub struct SessionStateManager {
    status: Mutex<SessionStatus>,
}

impl SessionStateManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SessionStatus> {
        self.status.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn current(&self) -> SessionStatus {
        *self.lock()
    }

    pub fn is_generating(&self) -> bool {
        self.current().is_generating()
    }

    /// Attempt a transition. This is the only way to change the status.
    pub fn transition(&self, event: SessionEvent) -> Result<TransitionResult, TransitionRejection> {
        let mut status = self.lock();
        let current = *status;

        match Self::compute_transition(current, event) {
            Some(next) if next == current => Ok(TransitionResult::Unchanged),
            Some(next) => {
                *status = next;
                Ok(TransitionResult::Changed {
                    from: current,
                    to: next,
                })
            }
            None => Err(TransitionRejection {
                current_state: current,
                attempted_event: event,
            }),
        }
    }

    fn compute_transition(current: SessionStatus, event: SessionEvent) -> Option<SessionStatus> {
        match (current, event) {
            (SessionStatus::Generating, SessionEvent::Generate) => None,
            (_, SessionEvent::Generate) => Some(SessionStatus::Generating),
            (SessionStatus::Generating, SessionEvent::Succeeded) => Some(SessionStatus::Success),
            (SessionStatus::Generating, SessionEvent::Failed) => Some(SessionStatus::Error),
            _ => None,
        }
    }

    /// Back to Idle
    pub fn reset(&self) {
        *self.lock() = SessionStatus::Idle;
    }
}
