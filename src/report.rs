use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Payload posted to the webhook once per invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub version: String,
    pub previous_version: String,
    pub source_branch: String,
    pub generated_at: DateTime<Utc>,
    pub work_items: Vec<WorkItemSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItemSummary {
    pub id: u64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub tags: Vec<String>,
    pub integration_build: Vec<String>,
}

/// What happened to one work item during the run.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkItemOutcome {
    pub id: u64,
    pub title: String,
    /// Value previously recorded under the version field
    pub recorded_version: Option<String>,
    pub version_updated: bool,
    pub history_updated: bool,
    /// History after the merge
    pub integration_build: String,
}

/// Result of a successful invocation, rendered by the terminal summary.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub pipeline_id: u64,
    pub last_run_id: u64,
    pub previous_run_id: u64,
    pub field_path: String,
    pub dry_run: bool,
    pub summary: RunSummary,
    pub outcomes: Vec<WorkItemOutcome>,
}

impl RunReport {
    pub fn updated_versions(&self) -> usize {
        self.outcomes.iter().filter(|o| o.version_updated).count()
    }

    pub fn updated_histories(&self) -> usize {
        self.outcomes.iter().filter(|o| o.history_updated).count()
    }
}
