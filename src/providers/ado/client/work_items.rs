use super::core::AdoClient;
use crate::error::Result;
use crate::providers::ado::types::{BuildWorkItemRef, FieldOperation, Paginated, WorkItem};

impl AdoClient {
    /// Work items linked to every build between two build ids, inclusive.
    pub async fn fetch_build_work_items(
        &self,
        from_build_id: u64,
        to_build_id: u64,
    ) -> Result<Vec<BuildWorkItemRef>> {
        let mut url = self.endpoint("build/workitems")?;
        url.query_pairs_mut()
            .append_pair("fromBuildId", &from_build_id.to_string())
            .append_pair("toBuildId", &to_build_id.to_string());

        let page: Paginated<BuildWorkItemRef> = self.get_json(url).await?;
        Ok(page.value)
    }

    pub async fn fetch_work_item(&self, work_item_id: &str) -> Result<WorkItem> {
        let url = self.endpoint(&format!("wit/workitems/{work_item_id}"))?;
        self.get_json(url).await
    }

    /// Applies a single-operation JSON-patch document to a work item.
    pub async fn update_work_item_field(
        &self,
        work_item_id: u64,
        operation: &FieldOperation,
    ) -> Result<()> {
        let url = self.endpoint(&format!("wit/workitems/{work_item_id}"))?;
        self.patch_json(url, std::slice::from_ref(operation)).await?;
        Ok(())
    }
}
