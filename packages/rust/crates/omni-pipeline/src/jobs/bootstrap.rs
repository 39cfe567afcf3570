//! Enqueue the root job and wait for the queue item to become an execution.

use std::time::Duration;

use omni_jenkins::JobStateClient;

use crate::error::{PipelineError, Result};
use crate::jobs::queue::RootExecution;

/// Enqueue `job_name` and poll its queue item every `poll_interval` until
/// Jenkins assigns a numbered execution.
///
/// # Errors
/// Returns an error if the enqueue or a queue poll fails, or
/// [`PipelineError::Cancelled`] if the item is cancelled while queued.
pub async fn enqueue_root_job(
    client: &dyn JobStateClient,
    job_name: &str,
    definition_url: &str,
    parameters: Option<&[(String, String)]>,
    poll_interval: Duration,
) -> Result<RootExecution> {
    let handle = client.enqueue(definition_url, parameters).await?;
    tracing::info!(
        event = "pipeline.enqueue.accepted",
        job = job_name,
        queue_url = %handle.url,
        parameters = parameters.map_or(0, <[_]>::len),
        "jenkins job queued"
    );

    loop {
        let item = client.poll_queue_item(&handle).await?;
        if item.is_cancelled() {
            tracing::warn!(
                event = "pipeline.enqueue.cancelled",
                job = job_name,
                queue_url = %handle.url,
                "queue item cancelled"
            );
            return Err(PipelineError::Cancelled {
                queue_url: handle.url,
            });
        }
        if let Some(executable) = item.executable {
            let (name, task_url) = match item.task {
                Some(task) => (task.name, task.url),
                None => (job_name.to_string(), definition_url.to_string()),
            };
            let root = RootExecution {
                name,
                definition_url: task_url,
                execution_url: executable.url,
                execution_number: executable.number,
            };
            tracing::debug!(
                event = "pipeline.enqueue.executing",
                job = %root.name,
                number = root.execution_number,
                url = %root.execution_url,
                "queue item left the queue"
            );
            return Ok(root);
        }
        tokio::time::sleep(poll_interval).await;
    }
}

/// Parse `name=value` job parameters; blank lines are skipped and values may
/// contain further `=` characters.
///
/// # Errors
/// Returns [`PipelineError::InvalidParameter`] for an entry without `=` or
/// with an empty name.
pub fn parse_job_parameters<'a>(
    entries: impl IntoIterator<Item = &'a str>,
) -> Result<Vec<(String, String)>> {
    let mut parameters = Vec::new();
    for entry in entries {
        let trimmed = entry.trim();
        if trimmed.is_empty() {
            continue;
        }
        let Some((name, value)) = trimmed.split_once('=') else {
            return Err(PipelineError::InvalidParameter(trimmed.to_string()));
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(PipelineError::InvalidParameter(trimmed.to_string()));
        }
        parameters.push((name.to_string(), value.to_string()));
    }
    Ok(parameters)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameters_split_on_first_equals() {
        let parsed = parse_job_parameters(["BRANCH=main", "", "  FLAGS=a=b  "]).expect("parse");
        assert_eq!(
            parsed,
            vec![
                ("BRANCH".to_string(), "main".to_string()),
                ("FLAGS".to_string(), "a=b".to_string()),
            ]
        );
    }

    #[test]
    fn parameter_without_name_is_rejected() {
        let error = parse_job_parameters(["=value"]).expect_err("must fail");
        assert!(matches!(error, PipelineError::InvalidParameter(entry) if entry == "=value"));
        assert!(parse_job_parameters(["novalue"]).is_err());
    }
}
