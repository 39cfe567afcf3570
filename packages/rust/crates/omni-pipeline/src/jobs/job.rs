//! One logical job: identity, tree links, console buffer and search cursor.
//!
//! Jobs hold no references to each other; `parent`, `children` and
//! `joined_to` are arena ids resolved through the owning [`crate::JobQueue`].

use std::fmt;
use std::time::Instant;

use omni_jenkins::{Cause, ExecutionInfo, JobDefinition};

use super::queue::{InFlight, JobId};
use super::result::ExecutionResult;
use super::state::JobState;

const BANNER_RULE: &str =
    "******************************************************************************";

/// Direction of the build-number search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchDirection {
    Backward,
    Forward,
}

/// Build-number search position, used only while locating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchCursor {
    /// Most likely number, taken from the job definition.
    pub initial: u64,
    /// Number to query next.
    pub next: u64,
    pub direction: SearchDirection,
}

impl Default for SearchCursor {
    fn default() -> Self {
        Self {
            initial: 0,
            next: 0,
            direction: SearchDirection::Backward,
        }
    }
}

impl SearchCursor {
    pub(crate) fn starting_at(number: u64) -> Self {
        Self {
            initial: number,
            next: number,
            direction: SearchDirection::Backward,
        }
    }

    /// Go back to the initial guess and search backward again.
    pub(crate) fn restart(&mut self) {
        self.next = self.initial;
        self.direction = SearchDirection::Backward;
    }

    /// Step after a candidate that belongs to someone else. The backward phase
    /// ends at build 1 or once the candidate started no later than the parent.
    pub(crate) fn advance(&mut self, candidate_started_before_parent: bool) {
        match self.direction {
            SearchDirection::Backward => {
                if candidate_started_before_parent || self.next <= 1 {
                    self.next = self.initial + 1;
                    self.direction = SearchDirection::Forward;
                } else {
                    self.next -= 1;
                }
            }
            SearchDirection::Forward => self.next += 1,
        }
    }
}

/// Append-only console text plus the server-side read offset.
#[derive(Debug, Clone, Default)]
pub(crate) struct ConsoleBuffer {
    text: String,
    /// Byte offset for the next progressive read.
    offset: u64,
    /// Prefix of `text` already released to the console owner.
    flushed: usize,
    enabled: bool,
    reads: usize,
}

impl ConsoleBuffer {
    pub(crate) fn append(&mut self, text: &str) {
        self.text.push_str(text);
    }

    pub(crate) fn offset(&self) -> u64 {
        self.offset
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn record_read(&mut self, next_offset: u64) {
        self.reads += 1;
        self.offset = self.offset.max(next_offset);
    }

    /// Returns `true` when ownership was newly granted.
    pub(crate) fn enable(&mut self) -> bool {
        let granted = !self.enabled;
        self.enabled = true;
        granted
    }

    pub(crate) fn take_unflushed(&mut self) -> Option<String> {
        if !self.enabled || self.flushed >= self.text.len() {
            return None;
        }
        let pending = self.text[self.flushed..].to_string();
        self.flushed = self.text.len();
        Some(pending)
    }
}

/// A logical job tracked by the queue.
#[derive(Debug, Clone)]
pub struct Job {
    pub(crate) id: JobId,
    pub(crate) state: JobState,
    pub(crate) parent: Option<JobId>,
    pub(crate) children: Vec<JobId>,
    pub(crate) joined_to: Option<JobId>,
    pub(crate) name: String,
    pub(crate) definition_url: String,
    pub(crate) execution_url: Option<String>,
    pub(crate) execution_number: Option<u64>,
    pub(crate) console: ConsoleBuffer,
    pub(crate) search: SearchCursor,
    pub(crate) search_restarts: u32,
    pub(crate) in_flight: Option<InFlight>,
    pub(crate) not_before: Option<Instant>,
    pub(crate) definition: Option<JobDefinition>,
    pub(crate) causes: Vec<Cause>,
    pub(crate) execution: Option<ExecutionInfo>,
}

impl Job {
    pub(crate) fn new(
        id: JobId,
        parent: Option<JobId>,
        name: String,
        definition_url: String,
        execution_url: Option<String>,
        execution_number: Option<u64>,
    ) -> Self {
        Self {
            id,
            state: JobState::New,
            parent,
            children: Vec::new(),
            joined_to: None,
            name,
            definition_url,
            execution_url,
            execution_number,
            console: ConsoleBuffer::default(),
            search: SearchCursor::default(),
            search_restarts: 0,
            in_flight: None,
            not_before: None,
            definition: None,
            causes: Vec::new(),
            execution: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> JobId {
        self.id
    }

    #[must_use]
    pub fn state(&self) -> JobState {
        self.state
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    #[must_use]
    pub fn parent(&self) -> Option<JobId> {
        self.parent
    }

    #[must_use]
    pub fn children(&self) -> &[JobId] {
        &self.children
    }

    /// Job this one was merged into, once `Joined`.
    #[must_use]
    pub fn joined_to(&self) -> Option<JobId> {
        self.joined_to
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn definition_url(&self) -> &str {
        &self.definition_url
    }

    #[must_use]
    pub fn execution_url(&self) -> Option<&str> {
        self.execution_url.as_deref()
    }

    /// `None` until the server's numbered execution for this job is known.
    #[must_use]
    pub fn execution_number(&self) -> Option<u64> {
        self.execution_number
    }

    #[must_use]
    pub fn console_text(&self) -> &str {
        &self.console.text
    }

    #[must_use]
    pub fn console_enabled(&self) -> bool {
        self.console.enabled
    }

    /// Number of successful progressive console reads.
    #[must_use]
    pub fn console_reads(&self) -> usize {
        self.console.reads
    }

    #[must_use]
    pub fn console_offset(&self) -> u64 {
        self.console.offset
    }

    #[must_use]
    pub fn search_cursor(&self) -> SearchCursor {
        self.search
    }

    #[must_use]
    pub fn search_restarts(&self) -> u32 {
        self.search_restarts
    }

    /// A request for this job is outstanding.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Earliest time the next tick may act on this job.
    #[must_use]
    pub fn not_before(&self) -> Option<Instant> {
        self.not_before
    }

    #[must_use]
    pub fn causes(&self) -> &[Cause] {
        &self.causes
    }

    /// Start timestamp (epoch millis) of the execution, once its result is known.
    #[must_use]
    pub fn execution_timestamp(&self) -> Option<i64> {
        self.execution.as_ref().map(|info| info.timestamp)
    }

    #[must_use]
    pub fn result(&self) -> Option<ExecutionResult> {
        self.execution
            .as_ref()
            .and_then(|info| info.result.as_deref())
            .map(ExecutionResult::parse)
    }

    pub(crate) fn ready(&self, now: Instant) -> bool {
        self.in_flight.is_none() && self.not_before.is_none_or(|at| now >= at)
    }

    pub(crate) fn append_banner(&mut self, verb: &str) {
        let url = self.execution_url.clone().unwrap_or_default();
        let banner = format!(
            "{BANNER_RULE}\nJenkins job {verb}: {}\n{url}\n{BANNER_RULE}\n",
            self.name
        );
        self.console.append(&banner);
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}:{}:", self.state, self.name)?;
        match self.execution_number {
            Some(number) => write!(f, "{number}")?,
            None => f.write_str("?")?,
        }
        if let Some(parent) = self.parent {
            write!(f, ", p:{parent}")?;
        }
        if let Some(joined) = self.joined_to {
            write!(f, ", j:{joined}")?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backward_search_steps_down_then_flips_forward() {
        let mut cursor = SearchCursor::starting_at(10);
        cursor.advance(false);
        assert_eq!(cursor.next, 9);
        assert_eq!(cursor.direction, SearchDirection::Backward);
        cursor.advance(true);
        assert_eq!(cursor.next, 11);
        assert_eq!(cursor.direction, SearchDirection::Forward);
        cursor.advance(true);
        assert_eq!(cursor.next, 12);
    }

    #[test]
    fn backward_search_stops_at_build_one() {
        let mut cursor = SearchCursor::starting_at(2);
        cursor.advance(false);
        assert_eq!(cursor.next, 1);
        cursor.advance(false);
        assert_eq!(cursor.next, 3);
        assert_eq!(cursor.direction, SearchDirection::Forward);
    }

    #[test]
    fn backward_search_is_bounded_by_initial_guess() {
        let mut cursor = SearchCursor::starting_at(50);
        let mut steps = 0;
        while cursor.direction == SearchDirection::Backward {
            cursor.advance(false);
            steps += 1;
            assert!(steps <= 50, "backward phase did not terminate");
        }
        assert_eq!(cursor.next, 51);
    }

    #[test]
    fn restart_returns_to_initial_guess() {
        let mut cursor = SearchCursor::starting_at(5);
        cursor.advance(true);
        cursor.advance(true);
        cursor.restart();
        assert_eq!(cursor, SearchCursor::starting_at(5));
    }

    #[test]
    fn console_releases_text_only_once_enabled() {
        let mut console = ConsoleBuffer::default();
        console.append("one\n");
        assert_eq!(console.take_unflushed(), None);
        assert!(console.enable());
        assert!(!console.enable());
        assert_eq!(console.take_unflushed().as_deref(), Some("one\n"));
        assert_eq!(console.take_unflushed(), None);
        console.append("two\n");
        assert_eq!(console.take_unflushed().as_deref(), Some("two\n"));
    }

    #[test]
    fn console_offset_never_moves_backward() {
        let mut console = ConsoleBuffer::default();
        console.record_read(40);
        console.record_read(12);
        assert_eq!(console.offset, 40);
        assert_eq!(console.reads, 2);
    }
}
