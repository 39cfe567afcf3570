//! Join resolver: maps a pipelined job onto the numbered execution Jenkins ran
//! for it.
//!
//! A downstream job only knows its name and definition URL. Jenkins may have
//! coalesced several trigger requests (A -> C and B -> C queued close
//! together) into one execution of C whose cause list names A first and B
//! after it. For every tracked job the first cause decides which logical job
//! owns the execution; jobs named by the later causes are joined to it.
//!
//! Search order: start from the definition's most likely number and walk
//! backward until a candidate started no later than the parent execution (or
//! build 1 is reached), then walk forward from the initial guess + 1. A 404
//! re-checks the definition: if the job is queued, or already finished past
//! the guess, the same number is retried; otherwise the search restarts from
//! the initial guess.

use std::time::Instant;

use omni_jenkins::{ExecutionInfo, ExecutionLookup, JobDefinition};

use crate::jobs::queue::{InFlight, JobId, JobQueue, PendingRequest, Request};
use crate::jobs::state::JobState;

impl JobQueue {
    /// Locating tick: join without a request when possible, else query the
    /// candidate at the search cursor.
    pub(crate) fn locate(&mut self, id: JobId) -> Option<PendingRequest> {
        if self.jobs[id.0].state != JobState::Locating || self.join_if_possible(id) {
            return None;
        }
        let job = &self.jobs[id.0];
        let number = job.search.next;
        tracing::debug!(
            event = "pipeline.locate.query",
            job = %job,
            number,
            direction = ?job.search.direction,
            "querying candidate execution"
        );
        let request = Request::Execution {
            definition_url: job.definition_url.clone(),
            number,
        };
        Some(self.dispatch(id, InFlight::Locate { number }, request))
    }

    /// Join `id` to a same-named job that is already streaming or done and
    /// whose coalesced causes include `id`'s parent.
    ///
    /// Returns `true` when `id` no longer needs locating.
    pub(crate) fn join_if_possible(&mut self, id: JobId) -> bool {
        let job = &self.jobs[id.0];
        if job.state != JobState::Locating {
            return true;
        }
        let Some(parent) = job.parent else {
            return false;
        };
        let target = self
            .jobs
            .iter()
            .filter(|other| !other.is_root() && other.id != id && other.name == job.name)
            .filter(|other| matches!(other.state, JobState::Streaming | JobState::Done))
            .find(|other| {
                other
                    .causes
                    .iter()
                    .skip(1)
                    .any(|cause| self.find_job_by_cause(cause) == Some(parent))
            })
            .map(|other| other.id);
        match target {
            Some(target) => self.set_joined(id, target),
            None => false,
        }
    }

    pub(crate) fn on_locate_reply(
        &mut self,
        id: JobId,
        number: u64,
        lookup: ExecutionLookup,
        now: Instant,
    ) -> Option<PendingRequest> {
        if self.jobs[id.0].state != JobState::Locating || self.join_if_possible(id) {
            // another job adopted or joined this one while the request was out
            return None;
        }
        match lookup {
            ExecutionLookup::NotFound => {
                let job = &self.jobs[id.0];
                tracing::debug!(
                    event = "pipeline.locate.not_found",
                    job = %job,
                    number,
                    "candidate execution not found; checking the queue"
                );
                let request = Request::Definition {
                    url: job.definition_url.clone(),
                };
                Some(self.dispatch(id, InFlight::Recheck { number }, request))
            }
            ExecutionLookup::Found(info) => {
                self.on_candidate(id, number, &info, now);
                None
            }
        }
    }

    pub(crate) fn on_recheck_reply(
        &mut self,
        id: JobId,
        number: u64,
        definition: JobDefinition,
        now: Instant,
    ) {
        let still_pending = definition.in_queue
            || definition
                .last_completed_number()
                .is_some_and(|completed| completed >= number);
        self.jobs[id.0].definition = Some(definition);
        if self.jobs[id.0].state != JobState::Locating || self.join_if_possible(id) {
            return;
        }

        let poll_interval = self.options.poll_interval;
        if still_pending {
            tracing::debug!(
                event = "pipeline.locate.waiting",
                job = %self.jobs[id.0],
                number,
                "execution queued or just ran; retrying the same number"
            );
            self.rest(id, now, poll_interval);
            return;
        }

        let job = &mut self.jobs[id.0];
        job.search.restart();
        job.search_restarts += 1;
        tracing::info!(
            event = "pipeline.locate.restarted",
            job = %job,
            restarts = job.search_restarts,
            "restarting search"
        );
        if let Some(limit) = self.options.search_restart_limit
            && self.jobs[id.0].search_restarts > limit
            && self.change_state(id, JobState::Lost)
        {
            tracing::warn!(
                event = "pipeline.locate.lost",
                job = %self.jobs[id.0],
                limit,
                "giving up on locating pipelined job"
            );
        }
        self.rest(id, now, poll_interval);
    }

    /// A candidate execution exists: adopt it, hand it to the job it belongs
    /// to, or keep searching.
    fn on_candidate(&mut self, id: JobId, number: u64, info: &ExecutionInfo, now: Instant) {
        let causes = info.causes().to_vec();
        let parent = self.jobs[id.0].parent;
        let first_cause_job = causes
            .first()
            .and_then(|cause| self.find_job_by_cause(cause));

        if let Some(first_cause_job) = first_cause_job {
            if Some(first_cause_job) == parent {
                self.set_streaming(id, causes, number);
                self.rest(id, now, self.options.poll_interval);
                return;
            }

            // belongs to another branch of the pipeline: start that job instead,
            // which may join this one as a side effect
            let name = self.jobs[id.0].name.clone();
            let owners: Vec<JobId> = self.jobs[first_cause_job.0]
                .children
                .iter()
                .copied()
                .filter(|&other| self.jobs[other.0].name == name)
                .collect();
            for owner in owners {
                if !matches!(
                    self.jobs[owner.0].state,
                    JobState::Streaming | JobState::Done
                ) {
                    self.set_streaming(owner, causes.clone(), number);
                }
            }
            if self.jobs[id.0].state == JobState::Joined {
                return;
            }
        }

        let parent_started = parent
            .and_then(|parent| self.jobs[parent.0].execution_timestamp());
        let started_before_parent =
            parent_started.is_none_or(|parent_started| info.timestamp <= parent_started);
        let job = &mut self.jobs[id.0];
        tracing::debug!(
            event = "pipeline.locate.mismatch",
            job = %job,
            number,
            candidate_timestamp = info.timestamp,
            parent_timestamp = parent_started,
            "candidate belongs to another trigger; continuing search"
        );
        job.search.advance(started_before_parent);
        self.rest(id, now, self.options.poll_interval);
    }
}
