#![allow(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

use omni_pipeline::test_support::{
    ClientCall, ScriptedJobStateClient, fast_options, queue_item_cancelled, queue_item_executing,
    queue_item_waiting,
};
use omni_pipeline::{
    JobState, PipelineError, RootExecution, TaskResult, enqueue_root_job, track_job,
};

const DEPLOY: &str = "http://ci/job/deploy";
const QUEUE_ITEM: &str = "http://ci/queue/item/5/api/json";

#[tokio::test]
async fn enqueue_waits_for_the_queue_item_to_execute() -> anyhow::Result<()> {
    let client = ScriptedJobStateClient::new();
    client
        .push_queue_item(QUEUE_ITEM, queue_item_waiting())
        .push_queue_item(QUEUE_ITEM, queue_item_executing(DEPLOY, "deploy", 7));
    let parameters = vec![("BRANCH".to_string(), "main".to_string())];

    let root = enqueue_root_job(
        &client,
        "deploy",
        DEPLOY,
        Some(&parameters),
        Duration::from_millis(1),
    )
    .await?;

    assert_eq!(
        root,
        RootExecution {
            name: "deploy".to_string(),
            definition_url: DEPLOY.to_string(),
            execution_url: "http://ci/job/deploy/7".to_string(),
            execution_number: 7,
        }
    );
    let calls = client.calls();
    assert_eq!(
        calls[0],
        ClientCall::Enqueue(DEPLOY.to_string(), Some(parameters))
    );
    assert_eq!(
        calls
            .iter()
            .filter(|call| matches!(call, ClientCall::PollQueue(url) if url == QUEUE_ITEM))
            .count(),
        2
    );
    Ok(())
}

#[tokio::test]
async fn cancelled_queue_item_is_fatal() {
    let client = ScriptedJobStateClient::new();
    let mut cancelled = queue_item_cancelled();
    cancelled.cancelled = false;
    cancelled.canceled = true;
    client
        .push_queue_item(QUEUE_ITEM, queue_item_waiting())
        .push_queue_item(QUEUE_ITEM, cancelled);

    let error = enqueue_root_job(&client, "deploy", DEPLOY, None, Duration::from_millis(1))
        .await
        .expect_err("cancelled item must fail");

    assert!(matches!(&error, PipelineError::Cancelled { queue_url } if queue_url == QUEUE_ITEM));
    assert_eq!(error.to_string(), "Jenkins job canceled.");
}

#[tokio::test]
async fn track_job_without_console_reports_queued() -> anyhow::Result<()> {
    let client = Arc::new(ScriptedJobStateClient::new());
    client.push_queue_item(QUEUE_ITEM, queue_item_executing(DEPLOY, "deploy", 3));

    let (queue, outcome) = track_job(
        client.clone(),
        "deploy",
        DEPLOY,
        None,
        fast_options(false, false),
        None,
    )
    .await?;

    assert_eq!(queue.root().state(), JobState::Queued);
    assert_eq!(queue.root().execution_number(), Some(3));
    assert_eq!(outcome.result, TaskResult::Success);
    assert_eq!(outcome.message, "Jenkins job queued");
    assert_eq!(
        client.calls(),
        vec![
            ClientCall::Enqueue(DEPLOY.to_string(), None),
            ClientCall::PollQueue(QUEUE_ITEM.to_string()),
        ]
    );
    Ok(())
}
