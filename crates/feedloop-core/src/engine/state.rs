use std::fmt;

/// Lifecycle of a `FeedLoop`. A feed handle exists only while `Running`
/// or `Stopping`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Starting,
    Running,
    Stopping,
    Stopped,
}

impl LoopState {
    pub fn has_feed(self) -> bool {
        matches!(self, LoopState::Running | LoopState::Stopping)
    }

    /// `start` is allowed from here.
    pub fn can_start(self) -> bool {
        matches!(self, LoopState::Idle | LoopState::Stopped)
    }
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoopState::Idle => "idle",
            LoopState::Starting => "starting",
            LoopState::Running => "running",
            LoopState::Stopping => "stopping",
            LoopState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}
