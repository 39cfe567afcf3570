//! Jenkins job-state client for omni-pipeline.
//!
//! Covers the read side the pipeline tracker polls (job definitions, numbered
//! executions, progressive console text, queue items) and the single write it
//! issues (enqueue a job). The [`JobStateClient`] trait is the seam the tracker
//! depends on; [`HttpJobStateClient`] is the `reqwest` implementation.

mod client;
mod config;
mod error;
mod types;
mod url;

pub use client::{HttpJobStateClient, JobStateClient};
pub use config::JenkinsEndpointConfig;
pub use error::{JenkinsError, Result};
pub use types::{
    BuildRef, Cause, ConsoleChunk, DownstreamProject, ExecutionAction, ExecutionInfo,
    ExecutionLookup, JobDefinition, QueueExecutable, QueueHandle, QueueItem, QueueTask,
};
pub use url::{add_url_segment, api_json_url, execution_url, job_url};
