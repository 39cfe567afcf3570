//! Job tracking: state machine, join resolver, queue scheduler and driver.

mod bootstrap;
mod job;
mod queue;
mod resolver;
mod result;
mod runtime;
mod state;

pub use bootstrap::{enqueue_root_job, parse_job_parameters};
pub use job::{Job, SearchCursor, SearchDirection};
pub use queue::{
    ConsoleEvent, JobId, JobQueue, PendingRequest, Reply, Request, RootExecution, TrackingOptions,
};
pub use result::ExecutionResult;
pub use runtime::{run_pipeline, track_job};
pub use state::JobState;
