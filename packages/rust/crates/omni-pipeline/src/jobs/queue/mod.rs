//! Job queue: arena of jobs, per-state tick dispatch and reply handling.
//!
//! The queue is synchronous. A tick returns the requests that jobs want to
//! issue; the driver performs them and feeds each reply back through
//! [`JobQueue::apply_reply`]. All job-set mutation happens in these two calls.

mod console;
mod types;

use std::time::{Duration, Instant};

use omni_jenkins::{
    Cause, ConsoleChunk, DownstreamProject, ExecutionLookup, JenkinsError, JobDefinition,
    execution_url,
};

use crate::error::PipelineError;
use crate::jobs::job::{Job, SearchCursor};
use crate::jobs::state::{JobState, TransitionContext};

pub(crate) use types::InFlight;
pub use types::{
    ConsoleEvent, JobId, PendingRequest, Reply, Request, RootExecution, TrackingOptions,
};

/// Owns every job of one tracking run. The set only grows.
#[derive(Debug)]
pub struct JobQueue {
    pub(crate) jobs: Vec<Job>,
    pub(crate) options: TrackingOptions,
    pub(crate) console_events: Vec<ConsoleEvent>,
}

impl JobQueue {
    /// Queue holding only the root job, in state `New`.
    #[must_use]
    pub fn new(root: RootExecution, options: TrackingOptions) -> Self {
        let root_job = Job::new(
            JobId(0),
            None,
            root.name,
            root.definition_url,
            Some(root.execution_url),
            Some(root.execution_number),
        );
        tracing::debug!(event = "pipeline.job.created", job = %root_job, "root job created");
        Self {
            jobs: vec![root_job],
            options: options.normalized(),
            console_events: Vec::new(),
        }
    }

    #[must_use]
    pub fn options(&self) -> &TrackingOptions {
        &self.options
    }

    #[must_use]
    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    #[must_use]
    pub fn job(&self, id: JobId) -> Option<&Job> {
        self.jobs.get(id.0)
    }

    #[must_use]
    pub fn root(&self) -> &Job {
        &self.jobs[0]
    }

    /// Ids of jobs the scheduler still ticks.
    #[must_use]
    pub fn active_jobs(&self) -> Vec<JobId> {
        self.jobs
            .iter()
            .filter(|job| job.state.is_active())
            .map(|job| job.id)
            .collect()
    }

    /// No job is active any more.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.jobs.iter().any(|job| job.state.is_active())
    }

    /// Job tracking numbered execution `number` of the job called `name`.
    #[must_use]
    pub fn find_job(&self, name: &str, number: u64) -> Option<JobId> {
        self.jobs
            .iter()
            .find(|job| job.name == name && job.execution_number == Some(number))
            .map(|job| job.id)
    }

    pub(crate) fn find_job_by_cause(&self, cause: &Cause) -> Option<JobId> {
        let project = cause.upstream_project.as_deref()?;
        let build = cause.upstream_build?;
        self.find_job(project, build)
    }

    /// Tick every active job, then arbitrate console ownership.
    ///
    /// Busy jobs and jobs whose poll delay has not elapsed are skipped.
    pub fn tick(&mut self, now: Instant) -> Vec<PendingRequest> {
        let mut requests = Vec::new();
        for id in self.active_jobs() {
            if !self.jobs[id.0].ready(now) {
                continue;
            }
            if let Some(request) = self.tick_job(id, now) {
                requests.push(request);
            }
        }
        self.arbitrate_console();
        requests
    }

    fn tick_job(&mut self, id: JobId, now: Instant) -> Option<PendingRequest> {
        match self.jobs[id.0].state {
            JobState::New => self.start_job(id),
            JobState::Locating => self.locate(id),
            JobState::Streaming => {
                let job = &self.jobs[id.0];
                let request = Request::Console {
                    execution_url: job.execution_url.clone().unwrap_or_default(),
                    offset: job.console.offset(),
                };
                Some(self.dispatch(id, InFlight::Console, request))
            }
            JobState::Finishing => self.finish(id, now),
            JobState::Done
            | JobState::Joined
            | JobState::Queued
            | JobState::Lost => None,
        }
    }

    /// Leave `New`, then fetch the definition once.
    fn start_job(&mut self, id: JobId) -> Option<PendingRequest> {
        let job = &self.jobs[id.0];
        if job.is_root() {
            if self.options.capture_console {
                let number = job.execution_number.unwrap_or_default();
                self.enable_console(id);
                self.set_streaming(id, Vec::new(), number);
            } else {
                self.change_state(id, JobState::Queued);
            }
        } else {
            self.change_state(id, JobState::Locating);
        }
        if !self.jobs[id.0].state.is_active() {
            return None;
        }
        let url = self.jobs[id.0].definition_url.clone();
        Some(self.dispatch(id, InFlight::Initialize, Request::Definition { url }))
    }

    fn finish(&mut self, id: JobId, now: Instant) -> Option<PendingRequest> {
        if !self.options.capture_console {
            self.change_state(id, JobState::Queued);
            self.rest(id, now, Duration::ZERO);
            return None;
        }
        let job = &self.jobs[id.0];
        let Some(number) = job.execution_number else {
            tracing::warn!(
                event = "pipeline.job.finish_without_number",
                job = %job,
                "finishing job has no execution number"
            );
            return None;
        };
        let request = Request::Execution {
            definition_url: job.definition_url.clone(),
            number,
        };
        Some(self.dispatch(id, InFlight::Result, request))
    }

    /// Feed back the reply to the request `job` issued.
    ///
    /// Returns a follow-up request when the job needs another read before it
    /// can rest (a 404 while locating triggers a definition re-check).
    ///
    /// # Errors
    /// Returns an error for replies that end the run: a missing execution
    /// while finishing, or a reply that does not match the outstanding request.
    pub fn apply_reply(
        &mut self,
        now: Instant,
        job: JobId,
        reply: Reply,
    ) -> Result<Option<PendingRequest>, PipelineError> {
        let Some(in_flight) = self.jobs.get_mut(job.0).and_then(|j| j.in_flight.take()) else {
            tracing::warn!(
                event = "pipeline.reply.unsolicited",
                %job,
                reply = reply.label(),
                "dropping reply for a job with no outstanding request"
            );
            return Ok(None);
        };
        let was_active = self.jobs[job.0].state.is_active();

        let follow_up = match (in_flight, reply) {
            (InFlight::Initialize, Reply::Definition(definition)) => {
                self.on_initialized(job, definition, now);
                None
            }
            (InFlight::Locate { number }, Reply::Execution(lookup)) => {
                self.on_locate_reply(job, number, lookup, now)
            }
            (InFlight::Recheck { number }, Reply::Definition(definition)) => {
                self.on_recheck_reply(job, number, definition, now);
                None
            }
            (InFlight::Console, Reply::Console(chunk)) => {
                self.on_console_chunk(job, chunk, now);
                None
            }
            (InFlight::Result, Reply::Execution(lookup)) => {
                self.on_result_reply(job, lookup, now)?;
                None
            }
            (expected, reply) => {
                return Err(PipelineError::UnexpectedReply {
                    job,
                    expected: expected.label(),
                    got: reply.label(),
                });
            }
        };

        if was_active && !self.jobs[job.0].state.is_active() {
            self.arbitrate_console();
        }
        Ok(follow_up)
    }

    fn on_initialized(&mut self, id: JobId, definition: JobDefinition, now: Instant) {
        let job = &mut self.jobs[id.0];
        job.search = SearchCursor::starting_at(definition.initial_search_number());
        tracing::debug!(
            event = "pipeline.job.initialized",
            job = %job,
            in_queue = definition.in_queue,
            initial_search_number = job.search.initial,
            downstream = definition.downstream_projects.len(),
            "job definition loaded"
        );
        job.definition = Some(definition);
        self.rest(id, now, self.options.poll_interval);
    }

    fn on_console_chunk(&mut self, id: JobId, chunk: ConsoleChunk, now: Instant) {
        self.console_log(id, &chunk.text);
        self.jobs[id.0].console.record_read(chunk.next_offset);
        if chunk.more_data {
            self.rest(id, now, self.options.poll_interval);
        } else {
            self.change_state(id, JobState::Finishing);
            self.rest(id, now, Duration::ZERO);
        }
    }

    fn on_result_reply(
        &mut self,
        id: JobId,
        lookup: ExecutionLookup,
        now: Instant,
    ) -> Result<(), PipelineError> {
        let ExecutionLookup::Found(info) = lookup else {
            return Err(PipelineError::Jenkins(JenkinsError::UnexpectedStatus {
                status: 404,
                context: format!("reading result of {}", self.jobs[id.0]),
            }));
        };
        if info.result.is_none() {
            self.rest(id, now, self.options.poll_interval);
            return Ok(());
        }

        let job = &mut self.jobs[id.0];
        job.execution = Some(info);
        job.append_banner("finished");
        self.flush_console(id);

        if self.options.capture_pipeline {
            let downstream = self.jobs[id.0]
                .definition
                .as_ref()
                .map(|definition| definition.downstream_projects.clone())
                .unwrap_or_default();
            for project in downstream {
                self.push_child(id, project);
            }
        }

        self.change_state(id, JobState::Done);
        self.rest(id, now, Duration::ZERO);
        let job = &self.jobs[id.0];
        tracing::info!(
            event = "pipeline.job.done",
            job = %job,
            result = %job.result().map(|r| r.label().to_string()).unwrap_or_default(),
            children = job.children.len(),
            "jenkins job done"
        );
        Ok(())
    }

    fn push_child(&mut self, parent: JobId, project: DownstreamProject) -> JobId {
        let id = JobId(self.jobs.len());
        let child = Job::new(id, Some(parent), project.name, project.url, None, None);
        tracing::debug!(event = "pipeline.job.created", job = %child, "pipelined job created");
        self.jobs.push(child);
        self.jobs[parent.0].children.push(id);
        id
    }

    /// Apply a transition if it is legal; otherwise warn and keep the old state.
    pub(crate) fn change_state(&mut self, id: JobId, to: JobState) -> bool {
        let capture_console = self.options.capture_console;
        let job = &mut self.jobs[id.0];
        let from = job.state;
        if from == to {
            return true;
        }
        let ctx = TransitionContext {
            is_root: job.is_root(),
            capture_console,
        };
        if !from.can_transition(to, ctx) {
            tracing::warn!(
                event = "pipeline.job.invalid_transition",
                job = %job,
                from = %from,
                to = %to,
                "ignoring invalid job state change"
            );
            return false;
        }
        job.state = to;
        tracing::debug!(
            event = "pipeline.job.state_changed",
            job = %job,
            from = %from,
            "job state changed"
        );
        true
    }

    /// Adopt numbered execution `number` for `id`, then join every sibling whose
    /// trigger was coalesced into it.
    pub(crate) fn set_streaming(&mut self, id: JobId, causes: Vec<Cause>, number: u64) -> bool {
        if !self.change_state(id, JobState::Streaming) {
            return false;
        }
        let job = &mut self.jobs[id.0];
        job.execution_number = Some(number);
        if job.execution_url.is_none() {
            job.execution_url = Some(execution_url(&job.definition_url, number));
        }
        job.causes = causes;
        job.append_banner("started");
        tracing::info!(
            event = "pipeline.job.streaming",
            job = %job,
            url = job.execution_url.as_deref().unwrap_or_default(),
            "jenkins job started"
        );
        self.flush_console(id);

        let name = self.jobs[id.0].name.clone();
        let coalesced: Vec<JobId> = self.jobs[id.0]
            .causes
            .iter()
            .skip(1)
            .filter_map(|cause| self.find_job_by_cause(cause))
            .flat_map(|cause_job| self.jobs[cause_job.0].children.iter().copied())
            .filter(|&child| child != id && self.jobs[child.0].name == name)
            .collect();
        for child in coalesced {
            self.set_joined(child, id);
        }
        true
    }

    /// Join `id` to `target`. A job that is already joined keeps its target.
    pub(crate) fn set_joined(&mut self, id: JobId, target: JobId) -> bool {
        if self.jobs[id.0].state == JobState::Joined || !self.change_state(id, JobState::Joined) {
            return false;
        }
        self.jobs[id.0].joined_to = Some(target);
        tracing::info!(
            event = "pipeline.job.joined",
            job = %self.jobs[id.0],
            target = %self.jobs[target.0],
            "pipelined job joined"
        );
        true
    }

    pub(crate) fn dispatch(
        &mut self,
        id: JobId,
        kind: InFlight,
        request: Request,
    ) -> PendingRequest {
        self.jobs[id.0].in_flight = Some(kind);
        PendingRequest { job: id, request }
    }

    pub(crate) fn rest(&mut self, id: JobId, now: Instant, delay: Duration) {
        self.jobs[id.0].not_before = Some(now + delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{downstream, fast_options, root_execution};

    const CHILD: &str = "http://ci/job/C";

    #[test]
    fn joined_job_keeps_its_first_target() {
        let mut queue = JobQueue::new(
            root_execution("http://ci/job/R", "R", 1),
            fast_options(true, true),
        );
        let root = queue.root().id();
        let late = queue.push_child(root, downstream("C", CHILD));
        let first = queue.push_child(root, downstream("C", CHILD));
        let second = queue.push_child(root, downstream("C", CHILD));
        assert!(queue.change_state(late, JobState::Locating));

        assert!(queue.set_joined(late, first));
        assert!(!queue.set_joined(late, second));

        let job = queue.job(late).expect("joined job");
        assert_eq!(job.state(), JobState::Joined);
        assert_eq!(job.joined_to(), Some(first));
    }

    #[test]
    fn same_state_change_is_accepted_without_side_effects() {
        let mut queue = JobQueue::new(
            root_execution("http://ci/job/R", "R", 1),
            fast_options(true, true),
        );
        let child = queue.push_child(queue.root().id(), downstream("C", CHILD));
        assert!(queue.change_state(child, JobState::Locating));
        assert!(queue.change_state(child, JobState::Locating));
        assert!(!queue.change_state(child, JobState::Done));
        assert_eq!(queue.job(child).expect("child").state(), JobState::Locating);
    }
}
