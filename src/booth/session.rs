// SPDX-License-Identifier: GPL-3.0-only

//! Camera session lifecycle
//!
//! Activation completes asynchronously, so each attempt carries a
//! generation token. Deactivating or re-activating bumps the
//! generation and orphans any attempt still in flight; a stale
//! completion is detected by its token and discarded by the caller.

/// Whether the camera session is live
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Inactive,
    Active,
}

impl SessionState {
    pub fn is_active(self) -> bool {
        matches!(self, SessionState::Active)
    }
}

#[derive(Debug, Default)]
pub struct CameraSession {
    state: SessionState,
    generation: u64,
}

impl CameraSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Begin an activation attempt, returning its token
    pub fn begin_activation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Whether a completion with this token is still the current attempt
    pub fn is_current(&self, token: u64) -> bool {
        self.generation == token
    }

    /// Accept a successful activation if its token is still current
    pub fn complete_activation(&mut self, token: u64) -> bool {
        if self.is_current(token) && self.state == SessionState::Inactive {
            self.state = SessionState::Active;
            true
        } else {
            false
        }
    }

    /// Stop the session and orphan any in-flight activation
    pub fn deactivate(&mut self) {
        self.generation += 1;
        self.state = SessionState::Inactive;
    }
}
