use std::io::Write as _;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tokio::sync::mpsc;

use omni_jenkins::{HttpJobStateClient, JenkinsEndpointConfig, JobStateClient};
use omni_pipeline::{
    ConsoleEvent, PipelineOutcome, RuntimeSettings, parse_job_parameters, track_job,
};

use crate::cli::RunArgs;
use crate::summary::write_summary;

/// Enqueue and track the job; `Ok(false)` when the tree did not succeed.
pub(crate) async fn run_mode(args: RunArgs, settings: &RuntimeSettings) -> Result<bool> {
    let endpoint = resolve_endpoint(&args, settings)?;
    let mut options = settings.jenkins.tracking_options();
    if args.no_console {
        options.capture_console = false;
    }
    if args.no_pipeline {
        options.capture_pipeline = false;
    }
    if let Some(poll_interval_ms) = args.poll_interval_ms {
        options.poll_interval = Duration::from_millis(poll_interval_ms);
    }
    let options = options.normalized();

    let parameters = parse_job_parameters(args.parameters.iter().map(String::as_str))?;
    let parameters = (!parameters.is_empty()).then_some(parameters);

    let client: Arc<dyn JobStateClient> = Arc::new(
        HttpJobStateClient::from_config(&endpoint).context("failed to build jenkins client")?,
    );
    let definition_url = endpoint.job_url(&args.job);

    let (console_tx, console_rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(print_console(console_rx));
    let tracked = track_job(
        client,
        &args.job,
        &definition_url,
        parameters.as_deref(),
        options,
        Some(console_tx),
    )
    .await;
    // the sender was moved into the run; the printer drains and exits once it is dropped
    if let Err(error) = printer.await {
        tracing::warn!(
            event = "pipeline.console.printer_failed",
            error = %error,
            "console printer crashed"
        );
    }
    let (_queue, outcome) = tracked?;

    report_outcome(&outcome);
    if let Some(dir) = args.summary_dir.as_deref() {
        match write_summary(dir, &outcome.report) {
            Ok(path) => tracing::info!(
                event = "pipeline.summary.written",
                path = %path.display(),
                "summary written"
            ),
            Err(error) => tracing::warn!(
                event = "pipeline.summary.write_failed",
                dir = %dir.display(),
                error = %error,
                "failed to write summary; continuing"
            ),
        }
    }
    Ok(outcome.result.is_success())
}

fn resolve_endpoint(args: &RunArgs, settings: &RuntimeSettings) -> Result<JenkinsEndpointConfig> {
    let mut endpoint = match (args.server_url.as_deref(), settings.jenkins.endpoint()) {
        (Some(server_url), Some(mut configured)) => {
            configured.server_url = server_url.to_string();
            configured
        }
        (Some(server_url), None) => JenkinsEndpointConfig::new(server_url),
        (None, Some(configured)) => configured,
        (None, None) => {
            bail!("no Jenkins server configured: pass --server-url or set jenkins.server_url")
        }
    };
    if args.job.trim().is_empty() {
        bail!("job name cannot be empty");
    }
    if let Some(username) = args.username.clone() {
        endpoint.username = Some(username);
    }
    if let Some(password_env) = args.password_env.clone() {
        endpoint.password_env_var = Some(password_env);
    }
    Ok(endpoint)
}

async fn print_console(mut console_rx: mpsc::UnboundedReceiver<ConsoleEvent>) {
    let mut stdout = std::io::stdout();
    while let Some(event) = console_rx.recv().await {
        if stdout.write_all(event.text.as_bytes()).is_err() {
            break;
        }
        let _ = stdout.flush();
    }
}

fn report_outcome(outcome: &PipelineOutcome) {
    println!("{}", outcome.message);
    match serde_json::to_string_pretty(&outcome.report) {
        Ok(json) => tracing::debug!(event = "pipeline.report", report = %json, "pipeline report"),
        Err(error) => tracing::warn!(
            event = "pipeline.report.encode_failed",
            error = %error,
            "failed to encode report"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(server_url: Option<&str>) -> RunArgs {
        RunArgs {
            job: "deploy".to_string(),
            server_url: server_url.map(str::to_string),
            username: Some("ci".to_string()),
            password_env: None,
            parameters: Vec::new(),
            no_console: false,
            no_pipeline: false,
            poll_interval_ms: None,
            summary_dir: None,
            verbose: false,
        }
    }

    #[test]
    fn cli_server_url_overrides_settings() {
        let mut settings = RuntimeSettings::default();
        settings.jenkins.server_url = Some("http://configured:8080".to_string());
        settings.jenkins.password_env = Some("JENKINS_TOKEN".to_string());
        let endpoint =
            resolve_endpoint(&args(Some("http://cli:8080")), &settings).expect("endpoint");
        assert_eq!(endpoint.server_url, "http://cli:8080");
        assert_eq!(endpoint.username.as_deref(), Some("ci"));
        assert_eq!(endpoint.password_env_var.as_deref(), Some("JENKINS_TOKEN"));
    }

    #[test]
    fn missing_server_url_is_an_error() {
        let error =
            resolve_endpoint(&args(None), &RuntimeSettings::default()).expect_err("must fail");
        assert!(error.to_string().contains("--server-url"));
    }
}
