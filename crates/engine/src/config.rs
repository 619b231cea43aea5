//! Engine configuration loaded from `engine.yaml`.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::Context;
use cogwork_types::AskResult;
use cogwork_util::config_file_path;
use serde::{Deserialize, Serialize};

use crate::{host::TracingHost, resources::ResourceRegistry};

/// Environment variable overriding the configuration file location.
pub const CONFIG_PATH_ENV: &str = "COGWORK_CONFIG_PATH";

/// What a workflow run does after an action fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop scheduling further actions.
    #[default]
    Halt,
    /// Record the failure and carry on with the next action.
    Continue,
}

/// Order in which a finished run disposes its actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisposeOrder {
    #[default]
    Reverse,
    Forward,
}

/// Runtime settings for workflow runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub failure_policy: FailurePolicy,
    /// Upper bound on attaching to an application; unbounded when absent.
    pub acquire_timeout_ms: Option<u64>,
    /// Once a run has disposed its actions, tear down the handles no other run still holds.
    pub quit_resources_on_finish: bool,
    /// Answer given to prompts by [`TracingHost`].
    pub ask_default: AskResult,
    pub dispose_order: DisposeOrder,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::Halt,
            acquire_timeout_ms: None,
            quit_resources_on_finish: true,
            ask_default: AskResult::Cancel,
            dispose_order: DisposeOrder::Reverse,
        }
    }
}

impl EngineConfig {
    pub fn acquire_timeout(&self) -> Option<Duration> {
        self.acquire_timeout_ms.map(Duration::from_millis)
    }

    /// A registry honouring the configured acquire timeout.
    pub fn build_registry(&self) -> Arc<ResourceRegistry> {
        let registry = match self.acquire_timeout() {
            Some(timeout) => ResourceRegistry::with_acquire_timeout(timeout),
            None => ResourceRegistry::new(),
        };
        Arc::new(registry)
    }

    pub fn build_host(&self) -> Arc<TracingHost> {
        Arc::new(TracingHost::new(self.ask_default))
    }
}

/// `$COGWORK_CONFIG_PATH` when set, otherwise `<config dir>/cogwork/engine.yaml`.
pub fn default_config_path() -> PathBuf {
    config_file_path(CONFIG_PATH_ENV, "engine.yaml")
}

/// Load the configuration from [`default_config_path`].
pub fn load_config() -> anyhow::Result<EngineConfig> {
    load_config_from_path(&default_config_path())
}

/// Load the configuration from `path`; a missing file yields the defaults.
///
/// The file may be YAML or JSON.
pub fn load_config_from_path(path: &Path) -> anyhow::Result<EngineConfig> {
    if !path.exists() {
        return Ok(EngineConfig::default());
    }

    let content = fs::read_to_string(path).with_context(|| format!("Failed to read engine config: {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(EngineConfig::default());
    }
    serde_yaml::from_str(&content).with_context(|| format!("Failed to parse engine config: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cogwork_util::expand_tilde;

    #[test]
    fn default_path_honors_environment_override() {
        let override_path = "~/custom/cogwork/engine.yaml";
        temp_env::with_var(CONFIG_PATH_ENV, Some(override_path), || {
            assert_eq!(default_config_path(), expand_tilde(override_path));
        });
    }

    #[test]
    fn missing_file_yields_defaults() {
        let directory = tempfile::tempdir().unwrap();
        let config = load_config_from_path(&directory.path().join("absent.yaml")).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert!(config.quit_resources_on_finish);
        assert_eq!(config.acquire_timeout(), None);
    }

    #[test]
    fn partial_yaml_overrides_selected_fields() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("engine.yaml");
        fs::write(&path, "failure_policy: continue\nacquire_timeout_ms: 2500\nask_default: yes\n").unwrap();

        let config = load_config_from_path(&path).unwrap();
        assert_eq!(config.failure_policy, FailurePolicy::Continue);
        assert_eq!(config.acquire_timeout(), Some(Duration::from_millis(2500)));
        assert_eq!(config.ask_default, AskResult::Yes);
        assert_eq!(config.dispose_order, DisposeOrder::Reverse);
        assert_eq!(config.build_registry().acquire_timeout(), Some(Duration::from_millis(2500)));
    }

    #[test]
    fn json_documents_are_accepted() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("engine.json");
        fs::write(&path, r#"{"dispose_order": "forward", "quit_resources_on_finish": false}"#).unwrap();

        let config = load_config_from_path(&path).unwrap();
        assert_eq!(config.dispose_order, DisposeOrder::Forward);
        assert!(!config.quit_resources_on_finish);
    }

    #[test]
    fn invalid_values_report_the_path() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("engine.yaml");
        fs::write(&path, "failure_policy: sometimes\n").unwrap();

        let error = load_config_from_path(&path).unwrap_err();
        assert!(format!("{error:#}").contains("Failed to parse engine config"));
    }
}
