use std::fmt;

/// Phases a daemon passes through during one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Configured but not yet listening.
    Idle,
    /// Control listener bound and port record written.
    Listening,
    /// Hosted task executing.
    Running,
    /// Cancellation requested; tearing down.
    ShuttingDown,
    /// Listener closed and port record removed.
    Stopped,
}

impl LifecycleState {
    /// Lower-case label used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Listening => "listening",
            Self::Running => "running",
            Self::ShuttingDown => "shutting_down",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
