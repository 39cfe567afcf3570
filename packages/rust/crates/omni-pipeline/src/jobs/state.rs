use std::fmt;

use serde::Serialize;

/// Lifecycle of one logical job.
///
/// ```text
/// root:      New -> Streaming -> Finishing -> Done
///            New -> Queued                        (console capture off)
/// pipelined: New -> Locating -> Streaming -> Finishing -> Done
///            New | Locating -> Joined             (coalesced into another job)
///            Locating -> Lost                     (search restart limit reached)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Created, definition not fetched yet.
    New,
    /// Searching for the numbered execution that fulfils this job.
    Locating,
    /// Reading console text.
    Streaming,
    /// Console drained; waiting for the execution result.
    Finishing,
    /// Result recorded.
    Done,
    /// Merged into another job that tracks the same execution.
    Joined,
    /// Enqueued only; nothing else is tracked.
    Queued,
    /// Execution could not be found.
    Lost,
}

/// Facts about a job that decide which transitions are legal.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TransitionContext {
    pub(crate) is_root: bool,
    pub(crate) capture_console: bool,
}

impl JobState {
    /// Whether the scheduler still ticks jobs in this state.
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(
            self,
            Self::New | Self::Locating | Self::Streaming | Self::Finishing
        )
    }

    /// Streaming or finishing: the job may write console output.
    #[must_use]
    pub fn is_running(self) -> bool {
        matches!(self, Self::Streaming | Self::Finishing)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Locating => "locating",
            Self::Streaming => "streaming",
            Self::Finishing => "finishing",
            Self::Done => "done",
            Self::Joined => "joined",
            Self::Queued => "queued",
            Self::Lost => "lost",
        }
    }

    pub(crate) fn can_transition(self, to: Self, ctx: TransitionContext) -> bool {
        match (self, to) {
            (Self::New, Self::Streaming) => ctx.is_root && ctx.capture_console,
            (Self::New, Self::Queued) => ctx.is_root && !ctx.capture_console,
            (Self::New, Self::Locating | Self::Joined) => !ctx.is_root,
            (Self::Locating, Self::Streaming | Self::Joined | Self::Lost)
            | (Self::Streaming, Self::Finishing)
            | (Self::Finishing, Self::Done) => true,
            (Self::Finishing, Self::Queued) => !ctx.capture_console,
            _ => false,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
