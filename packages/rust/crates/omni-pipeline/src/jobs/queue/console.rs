use super::{ConsoleEvent, JobId, JobQueue};
use crate::jobs::state::JobState;

impl JobQueue {
    /// Hand console ownership out so that at most one active job writes at a
    /// time.
    ///
    /// Runs only while no active job owns the console: every finished job that
    /// has not been shown yet is flushed in job-set order, then the single
    /// remaining running job (if exactly one) becomes the owner.
    pub fn arbitrate_console(&mut self) {
        if !self.options.capture_console || self.active_console_owner().is_some() {
            return;
        }
        let mut running = Vec::new();
        for index in 0..self.jobs.len() {
            let (id, state, enabled) = {
                let job = &self.jobs[index];
                (job.id, job.state, job.console.is_enabled())
            };
            match state {
                JobState::Done if !enabled => self.enable_console(id),
                JobState::Streaming | JobState::Finishing => running.push(id),
                _ => {}
            }
        }
        match running.as_slice() {
            [only] => self.enable_console(*only),
            [] => {}
            pending => {
                tracing::debug!(
                    event = "pipeline.console.pending",
                    running = pending.len(),
                    "several jobs running; console output deferred"
                );
            }
        }
    }

    /// Active job that currently owns the console.
    #[must_use]
    pub fn active_console_owner(&self) -> Option<JobId> {
        self.jobs
            .iter()
            .find(|job| job.state.is_active() && job.console.is_enabled())
            .map(|job| job.id)
    }

    /// Drain console text released since the last call, in release order.
    pub fn take_console_events(&mut self) -> Vec<ConsoleEvent> {
        std::mem::take(&mut self.console_events)
    }

    pub(crate) fn enable_console(&mut self, id: JobId) {
        if !self.options.capture_console {
            return;
        }
        if self.jobs[id.0].console.enable() {
            tracing::debug!(
                event = "pipeline.console.granted",
                job = %self.jobs[id.0],
                "console ownership granted"
            );
        }
        self.flush_console(id);
    }

    pub(crate) fn console_log(&mut self, id: JobId, text: &str) {
        self.jobs[id.0].console.append(text);
        self.flush_console(id);
    }

    pub(crate) fn flush_console(&mut self, id: JobId) {
        let job = &mut self.jobs[id.0];
        if let Some(text) = job.console.take_unflushed() {
            self.console_events.push(ConsoleEvent {
                job: id,
                name: job.name.clone(),
                execution_number: job.execution_number,
                text,
            });
        }
    }
}
