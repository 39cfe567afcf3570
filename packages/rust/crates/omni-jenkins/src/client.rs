//! Jenkins job-state client.
//!
//! **Endpoints used:**
//! 1. `POST <job>/build?delay=0sec` (or `buildWithParameters`) → `201` + `Location` of a queue item.
//! 2. `GET <queue item>/api/json` → `executable` appears once the item leaves the queue.
//! 3. `GET <job>/api/json` → queue flag, next/last build numbers, downstream projects.
//! 4. `GET <job>/<number>/api/json` → causes, timestamp and (eventually) result; `404` until created.
//! 5. `GET <execution>/logText/progressiveText/?start=<offset>` → console text plus
//!    `X-More-Data` / `X-Text-Size` headers.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, LOCATION};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::config::JenkinsEndpointConfig;
use crate::error::{JenkinsError, Result};
use crate::types::{
    ConsoleChunk, ExecutionInfo, ExecutionLookup, JobDefinition, QueueHandle, QueueItem,
};
use crate::url::{add_url_segment, api_json_url, execution_url};

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const MORE_DATA_HEADER: &str = "x-more-data";
const TEXT_SIZE_HEADER: &str = "x-text-size";

/// Read/enqueue operations the tracker needs from a Jenkins server.
///
/// Implementations never retry; callers poll on their own schedule.
#[async_trait]
pub trait JobStateClient: Send + Sync {
    /// Fetch job definition metadata.
    async fn get_definition(&self, definition_url: &str) -> Result<JobDefinition>;

    /// Fetch numbered execution `number`; `NotFound` on 404.
    async fn get_execution(&self, definition_url: &str, number: u64) -> Result<ExecutionLookup>;

    /// Read console text of an execution starting at byte `offset`.
    async fn get_console(&self, execution_url: &str, offset: u64) -> Result<ConsoleChunk>;

    /// Enqueue a new execution; `parameters` selects `buildWithParameters`.
    async fn enqueue(
        &self,
        definition_url: &str,
        parameters: Option<&[(String, String)]>,
    ) -> Result<QueueHandle>;

    /// Poll a queue item returned by [`JobStateClient::enqueue`].
    async fn poll_queue_item(&self, handle: &QueueHandle) -> Result<QueueItem>;
}

/// `reqwest`-backed client for one Jenkins server.
pub struct HttpJobStateClient {
    client: Client,
    username: Option<String>,
    password: Option<String>,
}

impl HttpJobStateClient {
    /// Build a client from endpoint config.
    ///
    /// # Errors
    /// Returns an error if the server URL is empty or the HTTP client cannot be built.
    pub fn from_config(config: &JenkinsEndpointConfig) -> Result<Self> {
        if config.server_url.trim().is_empty() {
            return Err(JenkinsError::InvalidConfig(
                "server_url cannot be empty".to_string(),
            ));
        }
        let timeout = config
            .request_timeout_secs
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS)
            .max(1);
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()
            .map_err(|e| JenkinsError::InvalidConfig(format!("reqwest client: {e}")))?;
        Ok(Self {
            client,
            username: config
                .username
                .clone()
                .filter(|user| !user.trim().is_empty()),
            password: config.resolve_password(),
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.username {
            Some(username) => request.basic_auth(username, self.password.as_deref()),
            None => request,
        }
    }

    async fn get(&self, url: &str) -> Result<Response> {
        let started = Instant::now();
        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(|error| {
                tracing::debug!(
                    event = "jenkins.http.request_failed",
                    url,
                    elapsed_ms = started.elapsed().as_millis(),
                    error = %error,
                    "jenkins request failed"
                );
                JenkinsError::from(error)
            })?;
        tracing::trace!(
            event = "jenkins.http.response",
            url,
            status = %response.status(),
            elapsed_ms = started.elapsed().as_millis(),
            "jenkins response received"
        );
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, context: &str) -> Result<T> {
        let response = self.get(url).await?;
        expect_status(&response, StatusCode::OK, context)?;
        decode_json(response).await
    }
}

#[async_trait]
impl JobStateClient for HttpJobStateClient {
    async fn get_definition(&self, definition_url: &str) -> Result<JobDefinition> {
        self.get_json(&api_json_url(definition_url), "reading job definition")
            .await
    }

    async fn get_execution(&self, definition_url: &str, number: u64) -> Result<ExecutionLookup> {
        let url = api_json_url(&execution_url(definition_url, number));
        let response = self.get(&url).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(ExecutionLookup::NotFound);
        }
        expect_status(&response, StatusCode::OK, "reading job execution")?;
        let info: ExecutionInfo = decode_json(response).await?;
        Ok(ExecutionLookup::Found(info))
    }

    async fn get_console(&self, execution_url: &str, offset: u64) -> Result<ConsoleChunk> {
        let url = add_url_segment(
            execution_url,
            &format!("/logText/progressiveText/?start={offset}"),
        );
        let response = self.get(&url).await?;
        expect_status(&response, StatusCode::OK, "reading job console")?;
        let more_data = header_str(response.headers(), MORE_DATA_HEADER)
            .is_some_and(|value| value.eq_ignore_ascii_case("true"));
        let text_size =
            header_str(response.headers(), TEXT_SIZE_HEADER).and_then(|v| v.parse::<u64>().ok());
        let text = response.text().await?;
        let next_offset = text_size.unwrap_or(offset + text.len() as u64);
        Ok(ConsoleChunk {
            text,
            more_data,
            next_offset,
        })
    }

    async fn enqueue(
        &self,
        definition_url: &str,
        parameters: Option<&[(String, String)]>,
    ) -> Result<QueueHandle> {
        let url = match parameters {
            Some(_) => add_url_segment(definition_url, "/buildWithParameters?delay=0sec"),
            None => add_url_segment(definition_url, "/build?delay=0sec"),
        };
        tracing::debug!(event = "jenkins.enqueue.request", url, "enqueueing job");
        let mut request = self.authorize(self.client.post(&url));
        if let Some(parameters) = parameters {
            request = request.form(parameters);
        }
        let response = request.send().await?;
        expect_status(&response, StatusCode::CREATED, "creating job")?;
        let location = header_str(response.headers(), LOCATION.as_str())
            .ok_or(JenkinsError::MissingHeader("Location"))?;
        Ok(QueueHandle {
            url: api_json_url(location),
        })
    }

    async fn poll_queue_item(&self, handle: &QueueHandle) -> Result<QueueItem> {
        self.get_json(&handle.url, "reading job queue").await
    }
}

fn expect_status(response: &Response, expected: StatusCode, context: &str) -> Result<()> {
    if response.status() == expected {
        return Ok(());
    }
    Err(JenkinsError::UnexpectedStatus {
        status: response.status().as_u16(),
        context: context.to_string(),
    })
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| JenkinsError::Decode(e.to_string()))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
