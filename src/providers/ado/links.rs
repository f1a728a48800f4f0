use url::Url;

/// Browser URL of a work item (e.g. <https://dev.azure.com/org/project/_workitems/edit/42>)
///
/// # Arguments
///
/// * `project_url` - Project root URL ending with a slash
/// * `work_item_id` - Numeric work item ID
pub fn work_item_url(project_url: &Url, work_item_id: u64) -> String {
    format!("{project_url}_workitems/edit/{work_item_id}")
}

/// Browser URL of a pipeline run (e.g. <https://dev.azure.com/org/project/_build/results?buildId=7>)
pub fn run_url(project_url: &Url, run_id: u64) -> String {
    format!("{project_url}_build/results?buildId={run_id}")
}
