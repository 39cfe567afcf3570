//! Async driver: ticks the queue on an interval and performs its requests as
//! tokio tasks.

use std::sync::Arc;

use omni_jenkins::JobStateClient;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

use crate::error::{PipelineError, Result};
use crate::jobs::bootstrap::enqueue_root_job;
use crate::jobs::queue::{
    ConsoleEvent, JobId, JobQueue, PendingRequest, Reply, Request, TrackingOptions,
};
use crate::report::PipelineOutcome;

type RequestResult = (JobId, omni_jenkins::Result<Reply>);

/// Drive `queue` until no job is active, then return the outcome.
///
/// Console text released by the owning job is sent on `console_tx` as it
/// appears. The first fatal error aborts every outstanding request.
///
/// # Errors
/// Returns the first transport error, unexpected HTTP status or mismatched
/// reply, or a crashed request task.
pub async fn run_pipeline(
    client: Arc<dyn JobStateClient>,
    queue: &mut JobQueue,
    console_tx: Option<mpsc::UnboundedSender<ConsoleEvent>>,
) -> Result<PipelineOutcome> {
    let mut ticker = tokio::time::interval(queue.options().tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut requests: JoinSet<RequestResult> = JoinSet::new();
    let root = queue.root();
    tracing::info!(
        event = "pipeline.run.started",
        job = %root,
        capture_console = queue.options().capture_console,
        capture_pipeline = queue.options().capture_pipeline,
        "tracking jenkins job"
    );

    loop {
        forward_console(queue, console_tx.as_ref());
        if queue.is_complete() {
            break;
        }

        tokio::select! {
            _ = ticker.tick() => {
                let now = tokio::time::Instant::now().into_std();
                for pending in queue.tick(now) {
                    spawn_request(&mut requests, &client, pending);
                }
            }
            Some(joined) = requests.join_next(), if !requests.is_empty() => {
                let (job, reply) = joined.map_err(|error| {
                    tracing::error!(
                        event = "pipeline.request.crashed",
                        error = %error,
                        "request worker crashed"
                    );
                    PipelineError::Worker(error.to_string())
                })?;
                let reply = reply.inspect_err(|error| {
                    tracing::error!(
                        event = "pipeline.request.failed",
                        %job,
                        error = %error,
                        "jenkins request failed"
                    );
                })?;
                let now = tokio::time::Instant::now().into_std();
                if let Some(follow_up) = queue.apply_reply(now, job, reply)? {
                    spawn_request(&mut requests, &client, follow_up);
                }
            }
        }
    }

    queue.arbitrate_console();
    forward_console(queue, console_tx.as_ref());
    if !requests.is_empty() {
        tracing::debug!(
            event = "pipeline.run.abandoned_requests",
            outstanding = requests.len(),
            "dropping requests of inactive jobs"
        );
    }

    let outcome = queue.outcome();
    tracing::info!(
        event = "pipeline.run.completed",
        result = ?outcome.result,
        jobs = outcome.report.node_count(),
        "{}",
        outcome.message
    );
    Ok(outcome)
}

/// Enqueue `job_name`, wait for its execution, then track it to completion.
///
/// # Errors
/// Returns the bootstrap error (failed enqueue, cancelled queue item) or any
/// fatal error of [`run_pipeline`].
pub async fn track_job(
    client: Arc<dyn JobStateClient>,
    job_name: &str,
    definition_url: &str,
    parameters: Option<&[(String, String)]>,
    options: TrackingOptions,
    console_tx: Option<mpsc::UnboundedSender<ConsoleEvent>>,
) -> Result<(JobQueue, PipelineOutcome)> {
    let root = enqueue_root_job(
        client.as_ref(),
        job_name,
        definition_url,
        parameters,
        options.poll_interval,
    )
    .await?;
    let mut queue = JobQueue::new(root, options);
    let outcome = run_pipeline(client, &mut queue, console_tx).await?;
    Ok((queue, outcome))
}

fn forward_console(queue: &mut JobQueue, console_tx: Option<&mpsc::UnboundedSender<ConsoleEvent>>) {
    for event in queue.take_console_events() {
        if let Some(tx) = console_tx {
            let _ = tx.send(event);
        }
    }
}

fn spawn_request(
    requests: &mut JoinSet<RequestResult>,
    client: &Arc<dyn JobStateClient>,
    pending: PendingRequest,
) {
    let client = Arc::clone(client);
    tracing::trace!(
        event = "pipeline.request.spawned",
        job = %pending.job,
        request = ?pending.request
    );
    requests.spawn(async move {
        let reply = perform(client.as_ref(), pending.request).await;
        (pending.job, reply)
    });
}

async fn perform(client: &dyn JobStateClient, request: Request) -> omni_jenkins::Result<Reply> {
    match request {
        Request::Definition { url } => client.get_definition(&url).await.map(Reply::Definition),
        Request::Execution {
            definition_url,
            number,
        } => client
            .get_execution(&definition_url, number)
            .await
            .map(Reply::Execution),
        Request::Console {
            execution_url,
            offset,
        } => client
            .get_console(&execution_url, offset)
            .await
            .map(Reply::Console),
    }
}
