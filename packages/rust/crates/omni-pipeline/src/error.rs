//! Error types for pipeline tracking runs.

use omni_jenkins::JenkinsError;
use thiserror::Error;

use crate::jobs::JobId;

/// Fatal errors of a tracking run. Recoverable conditions (a 404 while
/// locating, an illegal state change) are handled inside the queue and never
/// surface here.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Request to the Jenkins server failed.
    #[error(transparent)]
    Jenkins(#[from] JenkinsError),

    /// The queue item was cancelled before it produced an execution.
    #[error("Jenkins job canceled.")]
    Cancelled {
        /// Queue item URL.
        queue_url: String,
    },

    /// A reply arrived that does not answer the job's outstanding request.
    #[error("Unexpected {got} reply for {job} (expected {expected})")]
    UnexpectedReply {
        /// Job the reply was routed to.
        job: JobId,
        /// Kind of reply the job was waiting for.
        expected: &'static str,
        /// Kind of reply received.
        got: &'static str,
    },

    /// A request task panicked or was aborted.
    #[error("Request worker failed: {0}")]
    Worker(String),

    /// A `name=value` job parameter could not be parsed.
    #[error("Invalid job parameter `{0}`: expected name=value")]
    InvalidParameter(String),
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
