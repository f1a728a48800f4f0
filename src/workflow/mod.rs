//! Stamps the version of the last pipeline run on the work items it shipped.

mod history;
mod parallel;
mod selection;
mod version;

use chrono::Utc;
use log::{debug, info, warn};

use crate::error::{PrevUpdaterError, Result};
use crate::output::PhaseProgress;
use crate::providers::ado::types::{
    BuildWorkItemRef, FieldOperation, PipelineRun, Repository, WorkItem, INTEGRATION_BUILD_PATH,
};
use crate::report::{RunReport, RunSummary, WorkItemOutcome, WorkItemSummary};

pub use parallel::{FanOut, DEFAULT_CONCURRENCY};
pub use selection::{select_runs, RunPair};
pub use version::{needs_update, Version};

/// Read and write access to the work-tracking service.
#[allow(async_fn_in_trait)]
pub trait WorkTracker {
    /// Recent runs of a pipeline, newest first.
    async fn pipeline_runs(&self, pipeline_id: u64) -> Result<Vec<PipelineRun>>;

    async fn build_work_items(
        &self,
        from_build_id: u64,
        to_build_id: u64,
    ) -> Result<Vec<BuildWorkItemRef>>;

    async fn work_item(&self, work_item_id: &str) -> Result<WorkItem>;

    async fn repository(&self, repository_id: &str) -> Result<Repository>;

    async fn update_work_item_field(&self, work_item_id: u64, operation: &FieldOperation)
        -> Result<()>;

    /// Browser link to a work item, when the service has one.
    fn work_item_url(&self, _work_item_id: u64) -> Option<String> {
        None
    }

    /// Browser link to a pipeline run, when the service has one.
    fn run_url(&self, _run_id: u64) -> Option<String> {
        None
    }
}

/// Destination of the end-of-run summary.
#[allow(async_fn_in_trait)]
pub trait SummarySink {
    async fn post_summary(&self, summary: &RunSummary) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateFieldsParams {
    pub pipeline_id: u64,
    pub repository_id: String,
    /// Field reference or patch path, e.g. `Custom.Prev` or `/fields/Custom.Prev`
    pub field: String,
    pub branch_name: Option<String>,
    pub dry_run: bool,
}

impl UpdateFieldsParams {
    /// JSON-patch path of the version field.
    pub fn field_path(&self) -> String {
        let field = self.field.trim();
        if field.starts_with('/') {
            field.to_string()
        } else {
            format!("/fields/{field}")
        }
    }

    /// Field reference name as it appears in a work item's field bag.
    pub fn field_name(&self) -> &str {
        self.field.trim().rsplit('/').next().unwrap_or_default()
    }
}

/// Orchestrates one invocation: select runs, diff work items, write fields.
pub struct PrevUpdater<T, S> {
    tracker: T,
    sink: Option<S>,
    fan_out: FanOut,
}

impl<T: WorkTracker, S: SummarySink> PrevUpdater<T, S> {
    pub fn new(tracker: T, sink: Option<S>, fan_out: FanOut) -> Self {
        Self {
            tracker,
            sink,
            fan_out,
        }
    }

    /// Updates the version field of every work item linked to the builds
    /// between the last run and its baseline.
    ///
    /// Returns `Ok(None)` when the pipeline has no completed run.
    ///
    /// # Errors
    ///
    /// Fetch and selection failures abort the run. Field update and webhook
    /// failures do not stop sibling operations; they are returned together as
    /// one `Aggregate` error once every operation has been attempted.
    pub async fn update_fields_by_last_runs(
        &self,
        params: &UpdateFieldsParams,
    ) -> Result<Option<RunReport>> {
        let progress = PhaseProgress::start_phase_1(params.pipeline_id);

        let runs = self.tracker.pipeline_runs(params.pipeline_id).await?;
        if runs.is_empty() {
            progress.abandon("No runs found");
            info!("Pipeline {} has no runs, nothing to do", params.pipeline_id);
            return Ok(None);
        }

        let repository = self.tracker.repository(&params.repository_id).await?;
        let default_branch = repository.default_branch.unwrap_or_default();
        debug!(
            "Default branch of repository {}: {default_branch}",
            repository.name
        );

        let Some(pair) = select_runs(&runs, &default_branch, params.branch_name.as_deref())?
        else {
            progress.abandon("No completed runs found");
            warn!(
                "Pipeline {} has no completed run, nothing to do",
                params.pipeline_id
            );
            return Ok(None);
        };
        info!(
            "Last run {} ({}) compared with run {} ({})",
            pair.last.id, pair.last.name, pair.previous.id, pair.previous.name
        );
        if let Some(url) = self.tracker.run_url(pair.last.id) {
            info!("Last run: {url}");
        }

        let progress = progress.finish_phase_1_start_phase_2(runs.len());

        let work_items = self.fetch_work_items(&pair).await?;

        let progress = progress.finish_phase_2_start_phase_3(work_items.len());

        let version = pair.last.name.trim();
        let candidate = Version::parse(version);
        let field_path = params.field_path();
        let outcomes: Vec<WorkItemOutcome> = work_items
            .iter()
            .map(|item| plan_item(item, params.field_name(), candidate, version))
            .collect();

        let mut failures = Vec::new();

        for outcome in outcomes.iter().filter(|o| o.version_updated) {
            let operation = FieldOperation::add(&field_path, version);
            self.apply(outcome.id, &operation, params.dry_run, &mut failures)
                .await;
        }

        for outcome in outcomes.iter().filter(|o| o.history_updated) {
            let operation = FieldOperation::add(INTEGRATION_BUILD_PATH, &outcome.integration_build);
            self.apply(outcome.id, &operation, params.dry_run, &mut failures)
                .await;
        }

        let summary = self.build_summary(&pair, &work_items, &outcomes);

        if !work_items.is_empty() {
            self.deliver(&summary, params.dry_run, &mut failures).await;
        }

        progress.finish_phase_3(failures.len());

        PrevUpdaterError::join(failures)?;

        Ok(Some(RunReport {
            pipeline_id: params.pipeline_id,
            last_run_id: pair.last.id,
            previous_run_id: pair.previous.id,
            field_path,
            dry_run: params.dry_run,
            summary,
            outcomes,
        }))
    }

    /// Resolves the work items linked to the run range, keeping the order of
    /// the range query.
    async fn fetch_work_items(&self, pair: &RunPair) -> Result<Vec<WorkItem>> {
        let refs = self
            .tracker
            .build_work_items(pair.previous.id, pair.last.id)
            .await?;
        info!(
            "{} work items linked to builds {}..={}",
            refs.len(),
            pair.previous.id,
            pair.last.id
        );

        let tracker = &self.tracker;
        self.fan_out
            .map_ordered(refs, |reference| async move {
                tracker.work_item(&reference.id).await
            })
            .await
    }

    async fn apply(
        &self,
        work_item_id: u64,
        operation: &FieldOperation,
        dry_run: bool,
        failures: &mut Vec<PrevUpdaterError>,
    ) {
        if dry_run {
            info!(
                "[dry-run] {} <- {} on work item {work_item_id}",
                operation.path, operation.value
            );
            return;
        }

        match self
            .tracker
            .update_work_item_field(work_item_id, operation)
            .await
        {
            Ok(()) => debug!("Updated {} on work item {work_item_id}", operation.path),
            Err(e) => {
                warn!(
                    "Failed to update {} on work item {work_item_id}: {e}",
                    operation.path
                );
                failures.push(e);
            }
        }
    }

    async fn deliver(
        &self,
        summary: &RunSummary,
        dry_run: bool,
        failures: &mut Vec<PrevUpdaterError>,
    ) {
        let Some(sink) = &self.sink else {
            debug!("No webhook configured, summary not sent");
            return;
        };

        if dry_run {
            info!(
                "[dry-run] summary of {} work items not sent",
                summary.work_items.len()
            );
            return;
        }

        if let Err(e) = sink.post_summary(summary).await {
            warn!("Failed to deliver run summary: {e}");
            failures.push(e);
        }
    }

    fn build_summary(
        &self,
        pair: &RunPair,
        work_items: &[WorkItem],
        outcomes: &[WorkItemOutcome],
    ) -> RunSummary {
        RunSummary {
            version: pair.last.name.trim().to_string(),
            previous_version: pair.previous.name.trim().to_string(),
            source_branch: pair.last.ref_name().to_string(),
            generated_at: Utc::now(),
            work_items: work_items
                .iter()
                .zip(outcomes)
                .map(|(item, outcome)| WorkItemSummary {
                    id: item.id,
                    title: item.title().to_string(),
                    url: self.tracker.work_item_url(item.id),
                    tags: history::split_tags(item.tags()),
                    integration_build: history::split(&outcome.integration_build),
                })
                .collect(),
        }
    }
}

fn plan_item(
    item: &WorkItem,
    field_name: &str,
    candidate: Version,
    version: &str,
) -> WorkItemOutcome {
    let current_history = item.integration_build();
    let merged = history::merge(current_history, version);

    WorkItemOutcome {
        id: item.id,
        title: item.title().to_string(),
        recorded_version: item
            .field_str(field_name)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(ToString::to_string),
        version_updated: needs_update(item, field_name, candidate),
        history_updated: merged.is_some(),
        integration_build: merged.unwrap_or_else(|| current_history.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ado::types::fixtures::{completed_run, work_item};
    use crate::providers::ado::types::INTEGRATION_BUILD_FIELD;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    const MAIN: &str = "refs/heads/main";

    #[derive(Default)]
    struct FakeTracker {
        runs: Vec<PipelineRun>,
        runs_error: bool,
        repository_error: bool,
        default_branch: String,
        build_items: Vec<BuildWorkItemRef>,
        items: HashMap<String, WorkItem>,
        failing_updates: HashSet<u64>,
        range_calls: Mutex<Vec<(u64, u64)>>,
        updates: Mutex<Vec<(u64, FieldOperation)>>,
    }

    impl FakeTracker {
        fn with_items(mut self, items: Vec<WorkItem>) -> Self {
            self.build_items = items
                .iter()
                .map(|item| BuildWorkItemRef {
                    id: item.id.to_string(),
                    url: None,
                })
                .collect();
            self.items = items
                .into_iter()
                .map(|item| (item.id.to_string(), item))
                .collect();
            self
        }

        fn updates(&self) -> Vec<(u64, FieldOperation)> {
            self.updates.lock().unwrap().clone()
        }
    }

    impl WorkTracker for FakeTracker {
        async fn pipeline_runs(&self, _pipeline_id: u64) -> Result<Vec<PipelineRun>> {
            if self.runs_error {
                return Err(PrevUpdaterError::InternalServer);
            }
            Ok(self.runs.clone())
        }

        async fn build_work_items(&self, from: u64, to: u64) -> Result<Vec<BuildWorkItemRef>> {
            self.range_calls.lock().unwrap().push((from, to));
            Ok(self.build_items.clone())
        }

        async fn work_item(&self, work_item_id: &str) -> Result<WorkItem> {
            self.items
                .get(work_item_id)
                .cloned()
                .ok_or(PrevUpdaterError::NotFound)
        }

        async fn repository(&self, repository_id: &str) -> Result<Repository> {
            if self.repository_error {
                return Err(PrevUpdaterError::BadRequest);
            }
            Ok(Repository {
                id: repository_id.to_string(),
                name: "web".to_string(),
                default_branch: Some(self.default_branch.clone()),
                url: None,
                remote_url: None,
            })
        }

        async fn update_work_item_field(
            &self,
            work_item_id: u64,
            operation: &FieldOperation,
        ) -> Result<()> {
            self.updates
                .lock()
                .unwrap()
                .push((work_item_id, operation.clone()));
            if self.failing_updates.contains(&work_item_id) {
                return Err(PrevUpdaterError::Unrecognized { status: 409 });
            }
            Ok(())
        }

        fn work_item_url(&self, work_item_id: u64) -> Option<String> {
            Some(format!("https://ado.test/_workitems/edit/{work_item_id}"))
        }
    }

    #[derive(Default)]
    struct FakeSink {
        fail: bool,
        posted: Mutex<Vec<RunSummary>>,
    }

    impl SummarySink for FakeSink {
        async fn post_summary(&self, summary: &RunSummary) -> Result<()> {
            self.posted.lock().unwrap().push(summary.clone());
            if self.fail {
                return Err(PrevUpdaterError::InternalServer);
            }
            Ok(())
        }
    }

    fn params() -> UpdateFieldsParams {
        UpdateFieldsParams {
            pipeline_id: 862,
            repository_id: "62".to_string(),
            field: "Custom.Prev".to_string(),
            branch_name: None,
            dry_run: false,
        }
    }

    fn main_runs() -> Vec<PipelineRun> {
        vec![
            completed_run(4, "25.6.5.0", MAIN),
            completed_run(3, "25.6.5.1", MAIN),
            completed_run(2, "25.6.5.2", MAIN),
            completed_run(1, "25.6.5.3", MAIN),
        ]
    }

    fn tracker_with_items(items: Vec<WorkItem>) -> FakeTracker {
        FakeTracker {
            runs: main_runs(),
            default_branch: MAIN.to_string(),
            ..FakeTracker::default()
        }
        .with_items(items)
    }

    fn updater(tracker: FakeTracker, sink: Option<FakeSink>) -> PrevUpdater<FakeTracker, FakeSink> {
        PrevUpdater::new(tracker, sink, FanOut::new(2, None))
    }

    #[test]
    fn test_field_path_and_name() {
        let mut p = params();
        assert_eq!(p.field_path(), "/fields/Custom.Prev");
        assert_eq!(p.field_name(), "Custom.Prev");

        p.field = "/fields/Custom.Forecast".to_string();
        assert_eq!(p.field_path(), "/fields/Custom.Forecast");
        assert_eq!(p.field_name(), "Custom.Forecast");
    }

    #[tokio::test]
    async fn test_no_runs_is_a_no_op() {
        let updater = updater(FakeTracker::default(), Some(FakeSink::default()));

        let report = updater.update_fields_by_last_runs(&params()).await.unwrap();

        assert!(report.is_none());
        assert!(updater.tracker.updates().is_empty());
        assert!(updater.sink.as_ref().unwrap().posted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_runs_error_propagates() {
        let tracker = FakeTracker {
            runs_error: true,
            ..FakeTracker::default()
        };

        let result = updater(tracker, None).update_fields_by_last_runs(&params()).await;

        assert!(matches!(result, Err(PrevUpdaterError::InternalServer)));
    }

    #[tokio::test]
    async fn test_repository_error_propagates() {
        let tracker = FakeTracker {
            runs: main_runs(),
            repository_error: true,
            ..FakeTracker::default()
        };

        let result = updater(tracker, None).update_fields_by_last_runs(&params()).await;

        assert!(matches!(result, Err(PrevUpdaterError::BadRequest)));
    }

    #[tokio::test]
    async fn test_branch_not_found_propagates() {
        let tracker = tracker_with_items(vec![]);
        let mut p = params();
        p.branch_name = Some("release/9".to_string());

        let result = updater(tracker, None).update_fields_by_last_runs(&p).await;

        assert!(matches!(result, Err(PrevUpdaterError::BranchNotFound(_))));
    }

    #[tokio::test]
    async fn test_updates_versions_and_integration_builds() {
        let tracker = tracker_with_items(vec![
            work_item(1, &[("System.Title", "Login"), ("System.Tags", "front; auth")]),
            work_item(
                2,
                &[
                    ("System.Title", "Cart"),
                    ("Custom.Prev", "25.6.5.1"),
                    (INTEGRATION_BUILD_FIELD, "25.6.5.0"),
                ],
            ),
            work_item(
                3,
                &[
                    ("System.Title", "Search"),
                    ("Custom.Prev", "25.6.4.9"),
                    (INTEGRATION_BUILD_FIELD, "25.5.3.5"),
                ],
            ),
        ]);
        let updater = updater(tracker, Some(FakeSink::default()));

        let report = updater
            .update_fields_by_last_runs(&params())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(*updater.tracker.range_calls.lock().unwrap(), vec![(3, 4)]);
        assert_eq!((report.last_run_id, report.previous_run_id), (4, 3));
        assert_eq!(
            updater.tracker.updates(),
            vec![
                (1, FieldOperation::add("/fields/Custom.Prev", "25.6.5.0")),
                (3, FieldOperation::add("/fields/Custom.Prev", "25.6.5.0")),
                (1, FieldOperation::add(INTEGRATION_BUILD_PATH, "25.6.5.0")),
                (
                    3,
                    FieldOperation::add(INTEGRATION_BUILD_PATH, "25.5.3.5 | 25.6.5.0")
                ),
            ]
        );
        assert_eq!(report.updated_versions(), 2);
        assert_eq!(report.updated_histories(), 2);
        assert_eq!(report.outcomes[1].recorded_version.as_deref(), Some("25.6.5.1"));

        let posted = updater.sink.as_ref().unwrap().posted.lock().unwrap().clone();
        assert_eq!(posted.len(), 1);
        let summary = &posted[0];
        assert_eq!(summary.version, "25.6.5.0");
        assert_eq!(summary.previous_version, "25.6.5.1");
        assert_eq!(summary.source_branch, MAIN);
        let ids: Vec<u64> = summary.work_items.iter().map(|w| w.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(summary.work_items[0].tags, vec!["front", "auth"]);
        assert_eq!(summary.work_items[1].integration_build, vec!["25.6.5.0"]);
        assert_eq!(
            summary.work_items[2].integration_build,
            vec!["25.5.3.5", "25.6.5.0"]
        );
        assert_eq!(
            summary.work_items[2].url.as_deref(),
            Some("https://ado.test/_workitems/edit/3")
        );
    }

    #[tokio::test]
    async fn test_update_failures_are_aggregated() {
        let mut tracker = tracker_with_items(vec![
            work_item(1, &[]),
            work_item(2, &[]),
            work_item(3, &[]),
        ]);
        tracker.failing_updates = HashSet::from([1, 3]);
        let updater = updater(tracker, Some(FakeSink::default()));

        let result = updater.update_fields_by_last_runs(&params()).await;

        match result {
            Err(PrevUpdaterError::Aggregate(errors)) => assert_eq!(errors.len(), 4),
            other => panic!("expected aggregate error, got {other:?}"),
        }
        // Every operation was still attempted and the summary still delivered.
        assert_eq!(updater.tracker.updates().len(), 6);
        assert_eq!(updater.sink.as_ref().unwrap().posted.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_webhook_failure_is_reported() {
        let tracker = tracker_with_items(vec![work_item(1, &[])]);
        let sink = FakeSink {
            fail: true,
            ..FakeSink::default()
        };

        let result = updater(tracker, Some(sink))
            .update_fields_by_last_runs(&params())
            .await;

        assert!(matches!(result, Err(PrevUpdaterError::Aggregate(e)) if e.len() == 1));
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let tracker = tracker_with_items(vec![work_item(1, &[]), work_item(2, &[])]);
        let updater = updater(tracker, Some(FakeSink::default()));
        let mut p = params();
        p.dry_run = true;

        let report = updater.update_fields_by_last_runs(&p).await.unwrap().unwrap();

        assert!(report.dry_run);
        assert_eq!(report.updated_versions(), 2);
        assert!(updater.tracker.updates().is_empty());
        assert!(updater.sink.as_ref().unwrap().posted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_linked_work_items_skips_webhook() {
        let tracker = tracker_with_items(vec![]);
        let updater = updater(tracker, Some(FakeSink::default()));

        let report = updater
            .update_fields_by_last_runs(&params())
            .await
            .unwrap()
            .unwrap();

        assert!(report.outcomes.is_empty());
        assert!(updater.sink.as_ref().unwrap().posted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_work_item_fetch_error_aborts() {
        let mut tracker = tracker_with_items(vec![work_item(1, &[])]);
        tracker.build_items.push(BuildWorkItemRef {
            id: "404".to_string(),
            url: None,
        });
        let updater = updater(tracker, None);

        let result = updater.update_fields_by_last_runs(&params()).await;

        assert!(matches!(result, Err(PrevUpdaterError::NotFound)));
        assert!(updater.tracker.updates().is_empty());
    }

    #[tokio::test]
    async fn test_falls_back_to_default_branch_run() {
        let tracker = FakeTracker {
            runs: vec![
                completed_run(10, "25.7.0.1", "refs/heads/feature-x"),
                completed_run(9, "25.7.0.0", MAIN),
            ],
            default_branch: MAIN.to_string(),
            ..FakeTracker::default()
        }
        .with_items(vec![work_item(5, &[])]);
        let updater = updater(tracker, None);

        let report = updater
            .update_fields_by_last_runs(&params())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(*updater.tracker.range_calls.lock().unwrap(), vec![(9, 10)]);
        assert_eq!(report.summary.source_branch, "refs/heads/feature-x");
    }
}
