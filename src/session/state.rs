use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingCreate,
    AwaitingStart,
    Executing,
    AwaitingStop,
    Completed,
}

impl SessionState {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            SessionState::AwaitingCreate => "AWAITING_CREATE",
            SessionState::AwaitingStart => "AWAITING_START",
            SessionState::Executing => "EXECUTING",
            SessionState::AwaitingStop => "AWAITING_STOP",
            SessionState::Completed => "COMPLETED",
        }
    }

    /// Worker completion reports only count once the test is running.
    #[must_use]
    pub const fn accepts_completion(self) -> bool {
        matches!(self, SessionState::Executing | SessionState::AwaitingStop)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
