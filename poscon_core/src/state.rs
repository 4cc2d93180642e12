//! Operator-driven run states.
use std::fmt;

use crate::error::ControlError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RunState {
    #[default]
    Reset,
    Running,
    Stopped,
    /// Terminal: no transition leaves it.
    Shutdown,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunState::Reset => "reset",
            RunState::Running => "running",
            RunState::Stopped => "stopped",
            RunState::Shutdown => "shutdown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Default, Clone)]
pub struct RunStateMachine {
    state: RunState,
}

impl RunStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }

    pub fn is_shutdown(&self) -> bool {
        self.state == RunState::Shutdown
    }

    /// Move to `to` and return the state left behind. Re-entering a state
    /// is allowed (a second Reset resets again); nothing leaves Shutdown.
    pub fn transition(&mut self, to: RunState) -> Result<RunState, ControlError> {
        if self.state == RunState::Shutdown {
            return Err(ControlError::State(format!(
                "cannot enter {to} after shutdown"
            )));
        }
        let from = self.state;
        self.state = to;
        tracing::debug!(%from, %to, "run state transition");
        Ok(from)
    }
}
