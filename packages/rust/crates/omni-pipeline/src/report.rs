//! Result report for a finished tracking run.

use serde::Serialize;

use crate::jobs::{Job, JobId, JobQueue, JobState};

/// Overall verdict of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskResult {
    Success,
    Failure,
}

impl TaskResult {
    #[must_use]
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

/// One node of the pipeline tree.
///
/// A joined job is reported through the job it was merged into, so its
/// fields describe the execution that actually ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobReport {
    pub name: String,
    pub execution_number: Option<u64>,
    pub url: Option<String>,
    pub state: JobState,
    /// `Success`, `Not built`, ... once finished; `Queued` when only
    /// enqueued; `Unknown` otherwise.
    pub result: String,
    pub succeeded: bool,
    /// Set when this node was merged into another tracked job.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub joined: bool,
    pub children: Vec<JobReport>,
}

impl JobReport {
    /// This node and every descendant succeeded.
    #[must_use]
    pub fn tree_succeeded(&self) -> bool {
        self.succeeded && self.children.iter().all(JobReport::tree_succeeded)
    }

    /// Number of nodes in the tree.
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(JobReport::node_count).sum::<usize>()
    }
}

/// Terminal outcome handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineOutcome {
    pub result: TaskResult,
    pub message: String,
    pub report: JobReport,
}

impl JobQueue {
    /// Build the report tree from the root.
    #[must_use]
    pub fn report(&self) -> JobReport {
        self.report_node(self.root().id())
    }

    /// Verdict, completion message and report.
    #[must_use]
    pub fn outcome(&self) -> PipelineOutcome {
        let report = self.report();
        let result = if report.tree_succeeded() {
            TaskResult::Success
        } else {
            TaskResult::Failure
        };
        let message = if self.options.capture_pipeline {
            "Jenkins pipeline complete"
        } else if self.options.capture_console {
            "Jenkins job complete"
        } else {
            "Jenkins job queued"
        };
        PipelineOutcome {
            result,
            message: message.to_string(),
            report,
        }
    }

    /// Follow `joined_to` links to the job that tracks the execution.
    #[must_use]
    pub fn resolve_joined(&self, id: JobId) -> &Job {
        let mut job = &self.jobs[id.0];
        // joins always point at a job that is not itself joined, but bound the
        // walk by the arena size anyway
        for _ in 0..self.jobs.len() {
            match job.joined_to {
                Some(target) if job.state == JobState::Joined => job = &self.jobs[target.0],
                _ => break,
            }
        }
        job
    }

    fn report_node(&self, id: JobId) -> JobReport {
        let own = &self.jobs[id.0];
        let job = self.resolve_joined(id);
        let (result, succeeded) = match (job.state, job.result()) {
            (JobState::Done, Some(result)) => (result.label().to_string(), result.is_success()),
            (JobState::Queued, _) => ("Queued".to_string(), true),
            _ => ("Unknown".to_string(), false),
        };
        JobReport {
            name: job.name.clone(),
            execution_number: job.execution_number,
            url: job.execution_url.clone(),
            state: job.state,
            result,
            succeeded,
            joined: own.state == JobState::Joined,
            children: own
                .children
                .iter()
                .map(|&child| self.report_node(child))
                .collect(),
        }
    }
}
