//! Shared types for the job queue: ids, options, requests and replies.

use std::fmt;
use std::time::Duration;

use omni_jenkins::{ConsoleChunk, ExecutionLookup, JobDefinition};

/// Index of a job in the queue's arena. Stable for the life of the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub(crate) usize);

impl JobId {
    /// Position in [`crate::JobQueue::jobs`].
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job#{}", self.0)
    }
}

/// Tracking behaviour for one queue.
#[derive(Debug, Clone)]
pub struct TrackingOptions {
    /// Stream console text and wait for results. Off means "enqueue and report Queued".
    pub capture_console: bool,
    /// Follow downstream projects. Only honoured with console capture.
    pub capture_pipeline: bool,
    /// Delay between polls of the same job.
    pub poll_interval: Duration,
    /// Scheduler tick interval.
    pub tick_interval: Duration,
    /// Give up locating a downstream execution after this many search restarts.
    /// `None` keeps searching until the run ends.
    pub search_restart_limit: Option<u32>,
}

impl Default for TrackingOptions {
    fn default() -> Self {
        Self {
            capture_console: true,
            capture_pipeline: true,
            // matches the Jenkins web UI refresh rate
            poll_interval: Duration::from_secs(5),
            tick_interval: Duration::from_millis(10),
            search_restart_limit: None,
        }
    }
}

impl TrackingOptions {
    /// Pipeline capture requires console capture; clamp intervals to at least 1ms.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.capture_pipeline &= self.capture_console;
        self.tick_interval = self.tick_interval.max(Duration::from_millis(1));
        self
    }
}

/// The execution a queued root job turned into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootExecution {
    pub name: String,
    pub definition_url: String,
    pub execution_url: String,
    pub execution_number: u64,
}

/// One network read the driver must perform for a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Definition { url: String },
    Execution { definition_url: String, number: u64 },
    Console { execution_url: String, offset: u64 },
}

/// Answer to a [`Request`], fed back through [`crate::JobQueue::apply_reply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Definition(JobDefinition),
    Execution(ExecutionLookup),
    Console(ConsoleChunk),
}

impl Reply {
    pub(crate) fn label(&self) -> &'static str {
        match self {
            Self::Definition(_) => "definition",
            Self::Execution(_) => "execution",
            Self::Console(_) => "console",
        }
    }
}

/// A request tagged with the job it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub job: JobId,
    pub request: Request,
}

/// Why a job is busy; decides how the reply is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InFlight {
    /// First definition fetch.
    Initialize,
    /// Candidate execution lookup while locating.
    Locate { number: u64 },
    /// Definition re-check after a 404 on `number`.
    Recheck { number: u64 },
    Console,
    /// Execution result poll while finishing.
    Result,
}

impl InFlight {
    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::Initialize | Self::Recheck { .. } => "definition",
            Self::Locate { .. } | Self::Result => "execution",
            Self::Console => "console",
        }
    }
}

/// Console text released by the job that currently owns the console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleEvent {
    pub job: JobId,
    pub name: String,
    pub execution_number: Option<u64>,
    pub text: String,
}
