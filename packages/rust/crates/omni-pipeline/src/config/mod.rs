//! Config namespace: shared `settings.yaml` loading.

mod settings;

pub use settings::{
    JenkinsSettings, RuntimeSettings, load_runtime_settings, load_runtime_settings_from_paths,
    runtime_settings_paths, set_config_home_override,
};
