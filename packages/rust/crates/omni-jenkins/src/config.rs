//! Jenkins endpoint config: server URL and optional basic-auth credentials.

use serde::{Deserialize, Serialize};

use crate::url::job_url;

/// Connection settings for one Jenkins server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JenkinsEndpointConfig {
    /// Server base URL (e.g. `http://127.0.0.1:8080`).
    pub server_url: String,
    /// Basic-auth user name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Env var holding the basic-auth password or API token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env_var: Option<String>,
    /// Per-request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

impl JenkinsEndpointConfig {
    /// Anonymous endpoint with default timeout.
    #[must_use]
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            username: None,
            password_env_var: None,
            request_timeout_secs: None,
        }
    }

    /// Definition URL of `job_name` on this server.
    #[must_use]
    pub fn job_url(&self, job_name: &str) -> String {
        job_url(&self.server_url, job_name)
    }

    /// Password read from `password_env_var`; empty values count as unset.
    #[must_use]
    pub fn resolve_password(&self) -> Option<String> {
        let name = self.password_env_var.as_deref()?;
        std::env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }
}
