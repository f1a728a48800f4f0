use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::auth::Token;
use crate::error::PrevUpdaterError;
use crate::providers::ado::DEFAULT_RUN_WINDOW;
use crate::workflow::{FanOut, DEFAULT_CONCURRENCY};

const CANDIDATES: [&str; 4] = [
    "prev-updater.toml",
    "prev-updater.json",
    "prev-updater.yaml",
    "prev-updater.yml",
];

/// Configuration file structure for prev-updater.
///
/// Every value can also be given on the command line, which takes precedence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub ado: AdoConfig,

    #[serde(default)]
    pub webhook: WebhookConfig,

    #[serde(default)]
    pub fetch: FetchConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AdoConfig {
    /// Personal access token
    pub token: Option<String>,

    /// Azure DevOps instance base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    pub organization: Option<String>,

    pub project: Option<String>,

    pub pipeline_id: Option<u64>,

    pub repository_id: Option<String>,

    /// Version field, e.g. `Custom.PrevVersion`
    pub field: Option<String>,

    /// Restrict run selection to refs containing this text
    pub branch: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct WebhookConfig {
    /// Endpoint receiving the run summary; no summary is sent when unset
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FetchConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Upper bound for a whole batch of parallel fetches
    pub timeout_secs: Option<u64>,

    /// How many recent runs are considered
    #[serde(default = "default_run_window")]
    pub run_window: usize,
}

impl Default for AdoConfig {
    fn default() -> Self {
        Self {
            token: None,
            base_url: default_base_url(),
            organization: None,
            project: None,
            pipeline_id: None,
            repository_id: None,
            field: None,
            branch: None,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            timeout_secs: None,
            run_window: default_run_window(),
        }
    }
}

fn default_base_url() -> String {
    "https://dev.azure.com/".to_string()
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_run_window() -> usize {
    DEFAULT_RUN_WINDOW
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Uses `path` when given, otherwise the first of `prev-updater.toml`,
    /// `.json`, `.yaml`, `.yml` found in the working directory. Returns the
    /// defaults when nothing is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::discover(Path::new(".")),
        }
    }

    fn discover(dir: &Path) -> Result<Self> {
        for candidate in CANDIDATES {
            let path = dir.join(candidate);
            if path.exists() {
                return Self::load_from_path(&path);
            }
        }

        Ok(Self::default())
    }

    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        match path.extension().and_then(|ext| ext.to_str()).unwrap_or("") {
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
        }
    }
}

/// Fully resolved values for one `start` invocation.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub token: Token,
    pub base_url: String,
    pub organization: String,
    pub project: String,
    pub pipeline_id: u64,
    pub repository_id: String,
    pub field: String,
    pub branch: Option<String>,
    pub webhook_url: Option<String>,
    pub concurrency: usize,
    pub timeout: Option<Duration>,
    pub run_window: usize,
}

impl RunSettings {
    /// Checks that every required value is present.
    ///
    /// # Errors
    ///
    /// Returns a `Config` error naming the first missing value.
    pub fn resolve(config: &Config) -> std::result::Result<Self, PrevUpdaterError> {
        let ado = &config.ado;

        Ok(Self {
            token: Token::from(required(&ado.token, "token")?),
            base_url: ado.base_url.clone(),
            organization: required(&ado.organization, "organization")?,
            project: required(&ado.project, "project")?,
            pipeline_id: ado.pipeline_id.ok_or_else(|| missing("pipeline-id"))?,
            repository_id: required(&ado.repository_id, "repository-id")?,
            field: required(&ado.field, "field")?,
            branch: non_empty(&ado.branch),
            webhook_url: non_empty(&config.webhook.url),
            concurrency: config.fetch.concurrency,
            timeout: config.fetch.timeout_secs.map(Duration::from_secs),
            run_window: config.fetch.run_window,
        })
    }

    pub fn fan_out(&self) -> FanOut {
        FanOut::new(self.concurrency, self.timeout)
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

fn required(value: &Option<String>, name: &str) -> std::result::Result<String, PrevUpdaterError> {
    non_empty(value).ok_or_else(|| missing(name))
}

fn missing(name: &str) -> PrevUpdaterError {
    PrevUpdaterError::Config(format!(
        "Missing required value `{name}` (command line or [ado] section)"
    ))
}
