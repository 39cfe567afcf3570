//! Integration tests for `HttpJobStateClient` against a mock Jenkins server.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use axum::extract::{Form, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use omni_jenkins::{
    ExecutionLookup, HttpJobStateClient, JenkinsEndpointConfig, JenkinsError, JobStateClient,
    QueueHandle,
};
use serde_json::json;

#[derive(Clone)]
struct MockJenkins {
    base_url: String,
    seen_auth: Arc<Mutex<Vec<String>>>,
    seen_form: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockJenkins {
    fn record_auth(&self, headers: &HeaderMap) {
        if let Some(value) = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            && let Ok(mut seen) = self.seen_auth.lock()
        {
            seen.push(value.to_string());
        }
    }
}

async fn handle_definition(
    State(state): State<MockJenkins>,
    headers: HeaderMap,
) -> Json<serde_json::Value> {
    state.record_auth(&headers);
    Json(json!({
        "_class": "hudson.model.FreeStyleProject",
        "name": "deploy",
        "inQueue": false,
        "nextBuildNumber": 8,
        "lastBuild": { "number": 7, "url": format!("{}/job/deploy/7/", state.base_url) },
        "lastCompletedBuild": { "number": 6 },
        "downstreamProjects": [
            { "name": "smoke", "url": format!("{}/job/smoke/", state.base_url), "color": "blue" }
        ]
    }))
}

async fn handle_execution() -> Json<serde_json::Value> {
    Json(json!({
        "number": 7,
        "timestamp": 1_700_000_000_000_i64,
        "building": false,
        "result": "SUCCESS",
        "actions": [
            { "_class": "hudson.model.ParametersAction" },
            { "causes": [
                { "upstreamProject": "build", "upstreamBuild": 3 },
                { "upstreamProject": "lint", "upstreamBuild": 9 }
            ] }
        ]
    }))
}

async fn handle_console(Query(query): Query<HashMap<String, String>>) -> impl IntoResponse {
    let start = query.get("start").cloned().unwrap_or_default();
    if start == "0" {
        (
            [("X-More-Data", "true"), ("X-Text-Size", "12")],
            "first chunk\n",
        )
            .into_response()
    } else {
        ([("X-Text-Size", "24")], "second chunk").into_response()
    }
}

async fn handle_build(State(state): State<MockJenkins>, headers: HeaderMap) -> impl IntoResponse {
    state.record_auth(&headers);
    (
        StatusCode::CREATED,
        [(header::LOCATION, format!("{}/queue/item/5/", state.base_url))],
    )
}

async fn handle_build_with_parameters(
    State(state): State<MockJenkins>,
    Form(form): Form<Vec<(String, String)>>,
) -> impl IntoResponse {
    if let Ok(mut seen) = state.seen_form.lock() {
        seen.extend(form);
    }
    (
        StatusCode::CREATED,
        [(header::LOCATION, format!("{}/queue/item/6/", state.base_url))],
    )
}

async fn handle_queue_item(State(state): State<MockJenkins>) -> Json<serde_json::Value> {
    Json(json!({
        "cancelled": false,
        "executable": { "number": 8, "url": format!("{}/job/deploy/8/", state.base_url) },
        "task": { "name": "deploy", "url": format!("{}/job/deploy/", state.base_url) }
    }))
}

async fn handle_broken() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn spawn_mock_jenkins() -> Result<Option<MockJenkins>> {
    let listener = match tokio::net::TcpListener::bind("127.0.0.1:0").await {
        Ok(listener) => listener,
        Err(err) if err.kind() == std::io::ErrorKind::PermissionDenied => {
            eprintln!("skipping jenkins client tests: local socket bind is not permitted");
            return Ok(None);
        }
        Err(err) => return Err(err.into()),
    };
    let addr = listener.local_addr()?;
    let state = MockJenkins {
        base_url: format!("http://{addr}"),
        seen_auth: Arc::new(Mutex::new(Vec::new())),
        seen_form: Arc::new(Mutex::new(Vec::new())),
    };
    let app = Router::new()
        .route("/job/deploy/api/json", get(handle_definition))
        .route("/job/deploy/7/api/json", get(handle_execution))
        .route(
            "/job/deploy/7/logText/progressiveText/",
            get(handle_console),
        )
        .route("/job/deploy/build", post(handle_build))
        .route(
            "/job/deploy/buildWithParameters",
            post(handle_build_with_parameters),
        )
        .route("/queue/item/5/api/json", get(handle_queue_item))
        .route("/job/broken/api/json", get(handle_broken))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(Some(state))
}

fn client_for(mock: &MockJenkins) -> HttpJobStateClient {
    HttpJobStateClient::from_config(&JenkinsEndpointConfig::new(mock.base_url.clone()))
        .expect("client should build")
}

#[tokio::test]
async fn get_definition_parses_build_numbers_and_downstream_projects() -> Result<()> {
    let Some(mock) = spawn_mock_jenkins().await? else {
        return Ok(());
    };
    let client = client_for(&mock);
    let definition = client
        .get_definition(&format!("{}/job/deploy/", mock.base_url))
        .await?;

    assert!(!definition.in_queue);
    assert_eq!(definition.next_build_number, 8);
    assert_eq!(definition.initial_search_number(), 7);
    assert_eq!(definition.last_completed_number(), Some(6));
    assert_eq!(definition.downstream_projects.len(), 1);
    assert_eq!(definition.downstream_projects[0].name, "smoke");
    Ok(())
}

#[tokio::test]
async fn get_execution_reads_causes_from_first_action_with_causes() -> Result<()> {
    let Some(mock) = spawn_mock_jenkins().await? else {
        return Ok(());
    };
    let client = client_for(&mock);
    let lookup = client
        .get_execution(&format!("{}/job/deploy", mock.base_url), 7)
        .await?;
    let ExecutionLookup::Found(info) = lookup else {
        panic!("expected execution #7 to exist");
    };
    assert_eq!(info.result.as_deref(), Some("SUCCESS"));
    assert_eq!(info.timestamp, 1_700_000_000_000);
    let causes = info.causes();
    assert_eq!(causes.len(), 2);
    assert_eq!(causes[0].upstream_project.as_deref(), Some("build"));
    assert_eq!(causes[1].upstream_build, Some(9));
    Ok(())
}

#[tokio::test]
async fn get_execution_maps_404_to_not_found() -> Result<()> {
    let Some(mock) = spawn_mock_jenkins().await? else {
        return Ok(());
    };
    let client = client_for(&mock);
    let lookup = client
        .get_execution(&format!("{}/job/deploy", mock.base_url), 99)
        .await?;
    assert_eq!(lookup, ExecutionLookup::NotFound);
    Ok(())
}

#[tokio::test]
async fn get_console_follows_progressive_headers() -> Result<()> {
    let Some(mock) = spawn_mock_jenkins().await? else {
        return Ok(());
    };
    let client = client_for(&mock);
    let execution = format!("{}/job/deploy/7/", mock.base_url);

    let first = client.get_console(&execution, 0).await?;
    assert_eq!(first.text, "first chunk\n");
    assert!(first.more_data);
    assert_eq!(first.next_offset, 12);

    let second = client.get_console(&execution, first.next_offset).await?;
    assert_eq!(second.text, "second chunk");
    assert!(!second.more_data);
    assert_eq!(second.next_offset, 24);
    Ok(())
}

#[tokio::test]
async fn enqueue_returns_queue_item_api_url_and_sends_basic_auth() -> Result<()> {
    let Some(mock) = spawn_mock_jenkins().await? else {
        return Ok(());
    };
    let mut config = JenkinsEndpointConfig::new(mock.base_url.clone());
    config.username = Some("ci-bot".to_string());
    let client = HttpJobStateClient::from_config(&config)?;

    let handle = client
        .enqueue(&config.job_url("deploy"), None)
        .await?;
    assert_eq!(handle.url, format!("{}/queue/item/5/api/json", mock.base_url));

    let seen = mock.seen_auth.lock().map(|v| v.clone()).unwrap_or_default();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].starts_with("Basic "), "got: {}", seen[0]);

    let item = client.poll_queue_item(&handle).await?;
    assert!(!item.is_cancelled());
    assert_eq!(item.executable.map(|e| e.number), Some(8));
    assert_eq!(item.task.map(|t| t.name).as_deref(), Some("deploy"));
    Ok(())
}

#[tokio::test]
async fn enqueue_with_parameters_posts_form_fields() -> Result<()> {
    let Some(mock) = spawn_mock_jenkins().await? else {
        return Ok(());
    };
    let client = client_for(&mock);
    let parameters = vec![
        ("BRANCH".to_string(), "main".to_string()),
        ("DRY_RUN".to_string(), "true".to_string()),
    ];
    let handle = client
        .enqueue(
            &format!("{}/job/deploy", mock.base_url),
            Some(parameters.as_slice()),
        )
        .await?;
    assert_eq!(handle.url, format!("{}/queue/item/6/api/json", mock.base_url));
    let seen = mock.seen_form.lock().map(|v| v.clone()).unwrap_or_default();
    assert_eq!(seen, parameters);
    Ok(())
}

#[tokio::test]
async fn unexpected_status_is_an_error() -> Result<()> {
    let Some(mock) = spawn_mock_jenkins().await? else {
        return Ok(());
    };
    let client = client_for(&mock);
    let err = client
        .get_definition(&format!("{}/job/broken", mock.base_url))
        .await
        .unwrap_err();
    assert!(
        matches!(err, JenkinsError::UnexpectedStatus { status: 500, .. }),
        "expected 500 status error, got: {err}"
    );
    Ok(())
}

#[tokio::test]
async fn poll_queue_item_unknown_handle_is_unexpected_status() -> Result<()> {
    let Some(mock) = spawn_mock_jenkins().await? else {
        return Ok(());
    };
    let client = client_for(&mock);
    let handle = QueueHandle {
        url: format!("{}/queue/item/404/api/json", mock.base_url),
    };
    let err = client.poll_queue_item(&handle).await.unwrap_err();
    assert!(matches!(
        err,
        JenkinsError::UnexpectedStatus { status: 404, .. }
    ));
    Ok(())
}

#[test]
fn empty_server_url_is_rejected() {
    let result = HttpJobStateClient::from_config(&JenkinsEndpointConfig::new("  "));
    assert!(matches!(result, Err(JenkinsError::InvalidConfig(_))));
}
