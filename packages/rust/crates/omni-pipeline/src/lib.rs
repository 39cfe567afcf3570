//! Jenkins pipeline tracker.
//!
//! Queues a job, follows every job it triggers downstream, streams their
//! console output and resolves one success/failure verdict for the tree.
//!
//! - [`JobQueue`]: synchronous arena of jobs; `tick` yields requests, `apply_reply` consumes answers.
//! - [`run_pipeline`]: tokio driver performing those requests against a [`omni_jenkins::JobStateClient`].
//! - [`enqueue_root_job`]: bootstrap from a fresh enqueue to the root execution.

#![allow(missing_docs)]

mod config;
mod error;
mod jobs;
mod report;
#[doc(hidden)]
pub mod test_support;

pub use config::{
    JenkinsSettings, RuntimeSettings, load_runtime_settings, load_runtime_settings_from_paths,
    runtime_settings_paths, set_config_home_override,
};
pub use error::{PipelineError, Result};
pub use jobs::{
    ConsoleEvent, ExecutionResult, Job, JobId, JobQueue, JobState, PendingRequest, Reply, Request,
    RootExecution, SearchCursor, SearchDirection, TrackingOptions, enqueue_root_job,
    parse_job_parameters, run_pipeline, track_job,
};
pub use report::{JobReport, PipelineOutcome, TaskResult};
