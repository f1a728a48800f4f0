use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const INTEGRATION_BUILD_FIELD: &str = "Microsoft.VSTS.Build.IntegrationBuild";
pub const INTEGRATION_BUILD_PATH: &str = "/fields/Microsoft.VSTS.Build.IntegrationBuild";
pub const TITLE_FIELD: &str = "System.Title";
pub const TAGS_FIELD: &str = "System.Tags";

/// List envelope used by most Azure DevOps collection endpoints.
#[derive(Debug, Deserialize)]
pub struct Paginated<T> {
    #[serde(default)]
    #[allow(dead_code)]
    pub count: usize,
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

/// One execution of a pipeline.
///
/// The run `name` carries the build number, which is the version string
/// stamped on work items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRun {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    /// Lifecycle state (e.g. "inProgress", "completed")
    #[serde(default)]
    pub state: String,
    /// Outcome once completed (e.g. "succeeded", "failed")
    #[serde(default)]
    pub result: Option<String>,
    /// Only present on the single-run endpoint; the list endpoint omits it
    #[serde(default)]
    pub resources: Option<RunResources>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResources {
    #[serde(default)]
    pub repositories: Option<RunRepositories>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRepositories {
    #[serde(rename = "self", default)]
    pub self_: Option<RepositoryResource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryResource {
    #[serde(default)]
    pub ref_name: String,
    #[serde(default)]
    pub version: Option<String>,
}

impl PipelineRun {
    pub fn is_completed(&self) -> bool {
        self.state == "completed"
    }

    /// Source branch reference (e.g. "refs/heads/main"), empty when unknown.
    pub fn ref_name(&self) -> &str {
        self.resources
            .as_ref()
            .and_then(|r| r.repositories.as_ref())
            .and_then(|r| r.self_.as_ref())
            .map_or("", |s| s.ref_name.as_str())
    }

    pub fn has_resources(&self) -> bool {
        self.resources.is_some()
    }
}

/// Work item reference returned by the build range query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildWorkItemRef {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// A work item with its raw field bag.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: u64,
    #[serde(default)]
    pub rev: Option<u64>,
    #[serde(default)]
    pub fields: IndexMap<String, Value>,
}

impl WorkItem {
    /// String value of a field; non-string values count as absent.
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    pub fn title(&self) -> &str {
        self.field_str(TITLE_FIELD).unwrap_or_default()
    }

    pub fn tags(&self) -> &str {
        self.field_str(TAGS_FIELD).unwrap_or_default()
    }

    pub fn integration_build(&self) -> &str {
        self.field_str(INTEGRATION_BUILD_FIELD)
            .map(str::trim)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Absent on empty repositories
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub remote_url: Option<String>,
}

/// Single JSON-patch entry of a work item update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldOperation {
    pub op: String,
    pub path: String,
    pub value: String,
}

impl FieldOperation {
    pub fn add(path: &str, value: &str) -> Self {
        Self {
            op: "add".to_string(),
            path: path.to_string(),
            value: value.to_string(),
        }
    }
}
