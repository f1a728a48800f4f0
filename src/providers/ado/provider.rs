use log::{debug, info};

use crate::error::Result;
use crate::providers::ado::client::AdoClient;
use crate::providers::ado::links;
use crate::providers::ado::types::{
    BuildWorkItemRef, FieldOperation, PipelineRun, Repository, WorkItem,
};
use crate::workflow::{FanOut, WorkTracker};

pub const DEFAULT_RUN_WINDOW: usize = 50;

/// Azure DevOps backed [`WorkTracker`].
///
/// Wraps the REST client with the run window and the fan-out used to fill in
/// run details the list endpoint leaves out.
pub struct AdoProvider {
    client: AdoClient,
    fan_out: FanOut,
    run_window: usize,
}

impl AdoProvider {
    pub fn new(client: AdoClient, fan_out: FanOut, run_window: usize) -> Self {
        Self {
            client,
            fan_out,
            run_window: run_window.max(1),
        }
    }

    /// Replaces runs lacking repository resources with their single-run view.
    async fn hydrate_runs(
        &self,
        pipeline_id: u64,
        runs: Vec<PipelineRun>,
    ) -> Result<Vec<PipelineRun>> {
        let missing = runs.iter().filter(|run| !run.has_resources()).count();
        if missing == 0 {
            return Ok(runs);
        }

        debug!("Fetching details of {missing} runs without resources");

        let client = &self.client;
        self.fan_out
            .map_ordered(runs, |run| async move {
                if run.has_resources() {
                    Ok(run)
                } else {
                    client.fetch_pipeline_run(pipeline_id, run.id).await
                }
            })
            .await
    }
}

impl WorkTracker for AdoProvider {
    async fn pipeline_runs(&self, pipeline_id: u64) -> Result<Vec<PipelineRun>> {
        info!(
            "Fetching up to {} runs of pipeline {pipeline_id}...",
            self.run_window
        );
        let runs = self
            .client
            .fetch_pipeline_runs(pipeline_id, self.run_window)
            .await?;
        self.hydrate_runs(pipeline_id, runs).await
    }

    async fn build_work_items(
        &self,
        from_build_id: u64,
        to_build_id: u64,
    ) -> Result<Vec<BuildWorkItemRef>> {
        self.client
            .fetch_build_work_items(from_build_id, to_build_id)
            .await
    }

    async fn work_item(&self, work_item_id: &str) -> Result<WorkItem> {
        self.client.fetch_work_item(work_item_id).await
    }

    async fn repository(&self, repository_id: &str) -> Result<Repository> {
        self.client.fetch_repository(repository_id).await
    }

    async fn update_work_item_field(
        &self,
        work_item_id: u64,
        operation: &FieldOperation,
    ) -> Result<()> {
        self.client
            .update_work_item_field(work_item_id, operation)
            .await
    }

    fn work_item_url(&self, work_item_id: u64) -> Option<String> {
        Some(links::work_item_url(self.client.project_url(), work_item_id))
    }

    fn run_url(&self, run_id: u64) -> Option<String> {
        Some(links::run_url(self.client.project_url(), run_id))
    }
}
