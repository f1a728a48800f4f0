use super::core::AdoClient;
use crate::error::Result;
use crate::providers::ado::types::Repository;

impl AdoClient {
    /// Repository metadata, used to resolve the default branch.
    pub async fn fetch_repository(&self, repository_id: &str) -> Result<Repository> {
        let url = self.endpoint(&format!("git/repositories/{repository_id}"))?;
        self.get_json(url).await
    }
}
