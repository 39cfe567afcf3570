//! Runtime settings loader for omni-pipeline.
//!
//! Loads and merges:
//! - System defaults: `<PRJ_ROOT>/packages/conf/settings.yaml`
//! - User overrides:  `<PRJ_CONFIG_HOME>/omni-dev-fusion/settings.yaml`
//!
//! Merge precedence is user over system. Only the `jenkins:` section is read;
//! other sections of the shared file are ignored.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use omni_jenkins::JenkinsEndpointConfig;
use serde::Deserialize;

use crate::jobs::TrackingOptions;

const DEFAULT_SYSTEM_SETTINGS_RELATIVE_PATH: &str = "packages/conf/settings.yaml";
const DEFAULT_USER_SETTINGS_RELATIVE_PATH: &str = "omni-dev-fusion/settings.yaml";
const DEFAULT_CONFIG_HOME_RELATIVE_PATH: &str = ".config";
static CONFIG_HOME_OVERRIDE: OnceLock<PathBuf> = OnceLock::new();

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuntimeSettings {
    #[serde(default)]
    pub jenkins: JenkinsSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JenkinsSettings {
    pub server_url: Option<String>,
    pub username: Option<String>,
    /// Env var holding the password or API token.
    pub password_env: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub tick_interval_ms: Option<u64>,
    pub capture_console: Option<bool>,
    pub capture_pipeline: Option<bool>,
    pub search_restart_limit: Option<u32>,
}

impl RuntimeSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            jenkins: self.jenkins.merge(overlay.jenkins),
        }
    }
}

impl JenkinsSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            server_url: overlay.server_url.or(self.server_url),
            username: overlay.username.or(self.username),
            password_env: overlay.password_env.or(self.password_env),
            request_timeout_secs: overlay.request_timeout_secs.or(self.request_timeout_secs),
            poll_interval_ms: overlay.poll_interval_ms.or(self.poll_interval_ms),
            tick_interval_ms: overlay.tick_interval_ms.or(self.tick_interval_ms),
            capture_console: overlay.capture_console.or(self.capture_console),
            capture_pipeline: overlay.capture_pipeline.or(self.capture_pipeline),
            search_restart_limit: overlay.search_restart_limit.or(self.search_restart_limit),
        }
    }

    /// Endpoint config, or `None` when no server URL is configured.
    #[must_use]
    pub fn endpoint(&self) -> Option<JenkinsEndpointConfig> {
        let server_url = self
            .server_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())?;
        Some(JenkinsEndpointConfig {
            server_url: server_url.to_string(),
            username: self.username.clone(),
            password_env_var: self.password_env.clone(),
            request_timeout_secs: self.request_timeout_secs,
        })
    }

    /// Tracking options with defaults for unset fields.
    #[must_use]
    pub fn tracking_options(&self) -> TrackingOptions {
        let defaults = TrackingOptions::default();
        TrackingOptions {
            capture_console: self.capture_console.unwrap_or(defaults.capture_console),
            capture_pipeline: self.capture_pipeline.unwrap_or(defaults.capture_pipeline),
            poll_interval: self
                .poll_interval_ms
                .map_or(defaults.poll_interval, Duration::from_millis),
            tick_interval: self
                .tick_interval_ms
                .map_or(defaults.tick_interval, Duration::from_millis),
            search_restart_limit: self.search_restart_limit.or(defaults.search_restart_limit),
        }
        .normalized()
    }
}

/// Load merged runtime settings (user overrides system).
#[must_use]
pub fn load_runtime_settings() -> RuntimeSettings {
    let (system_path, user_path) = runtime_settings_paths();
    load_runtime_settings_from_paths(&system_path, &user_path)
}

#[doc(hidden)]
#[must_use]
pub fn runtime_settings_paths() -> (PathBuf, PathBuf) {
    let root = project_root();
    let system_path = root.join(DEFAULT_SYSTEM_SETTINGS_RELATIVE_PATH);
    let user_path = resolve_config_home(&root).join(DEFAULT_USER_SETTINGS_RELATIVE_PATH);
    (system_path, user_path)
}

#[doc(hidden)]
#[must_use]
pub fn load_runtime_settings_from_paths(system: &Path, user: &Path) -> RuntimeSettings {
    load_one(system).merge(load_one(user))
}

fn load_one(path: &Path) -> RuntimeSettings {
    if !path.exists() {
        return RuntimeSettings::default();
    }
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) => {
            tracing::warn!(
                event = "pipeline.settings.read_failed",
                path = %path.display(),
                error = %error,
                "failed to read settings file; ignoring"
            );
            return RuntimeSettings::default();
        }
    };
    match serde_yaml::from_str::<Option<RuntimeSettings>>(&raw) {
        Ok(value) => value.unwrap_or_default(),
        Err(error) => {
            tracing::warn!(
                event = "pipeline.settings.parse_failed",
                path = %path.display(),
                error = %error,
                "failed to parse settings yaml; ignoring file"
            );
            RuntimeSettings::default()
        }
    }
}

fn project_root() -> PathBuf {
    std::env::var("PRJ_ROOT")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map_or_else(
            || std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            PathBuf::from,
        )
}

/// Set config-home override (used by CLI `--conf`).
///
/// The path can be absolute, or relative to `PRJ_ROOT`/cwd.
pub fn set_config_home_override(path: impl Into<PathBuf>) {
    let path = path.into();
    if path.as_os_str().is_empty() {
        return;
    }
    if CONFIG_HOME_OVERRIDE.set(path.clone()).is_err()
        && let Some(current) = CONFIG_HOME_OVERRIDE.get()
        && current != &path
    {
        tracing::warn!(
            current = %current.display(),
            ignored = %path.display(),
            "config home override already set; ignoring subsequent value"
        );
    }
}

fn resolve_config_home(project_root: &Path) -> PathBuf {
    if let Some(path) = CONFIG_HOME_OVERRIDE.get() {
        return absolutize(project_root, path.clone());
    }

    let configured = std::env::var("PRJ_CONFIG_HOME")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_CONFIG_HOME_RELATIVE_PATH.to_string());
    absolutize(project_root, PathBuf::from(configured))
}

fn absolutize(project_root: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        project_root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracking_options_default_when_unset() {
        let options = JenkinsSettings::default().tracking_options();
        assert!(options.capture_console);
        assert!(options.capture_pipeline);
        assert_eq!(options.poll_interval, Duration::from_secs(5));
        assert_eq!(options.tick_interval, Duration::from_millis(10));
        assert_eq!(options.search_restart_limit, None);
    }

    #[test]
    fn pipeline_capture_needs_console_capture() {
        let settings = JenkinsSettings {
            capture_console: Some(false),
            capture_pipeline: Some(true),
            ..JenkinsSettings::default()
        };
        assert!(!settings.tracking_options().capture_pipeline);
    }

    #[test]
    fn blank_server_url_yields_no_endpoint() {
        let settings = JenkinsSettings {
            server_url: Some("  ".to_string()),
            ..JenkinsSettings::default()
        };
        assert!(settings.endpoint().is_none());
    }
}
