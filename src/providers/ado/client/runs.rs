use log::debug;

use super::core::{read_json, AdoClient, CONTINUATION_HEADER};
use crate::error::Result;
use crate::providers::ado::types::{Paginated, PipelineRun};

impl AdoClient {
    /// Lists the most recent runs of a pipeline, newest first.
    ///
    /// Follows the continuation token header until `limit` runs have been read
    /// or the server reports no further page.
    pub async fn fetch_pipeline_runs(
        &self,
        pipeline_id: u64,
        limit: usize,
    ) -> Result<Vec<PipelineRun>> {
        let mut all_runs = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut url = self.endpoint(&format!("pipelines/{pipeline_id}/runs"))?;
            if let Some(token) = &continuation {
                url.query_pairs_mut().append_pair("continuationToken", token);
            }

            let response = self.get(url).await?;
            continuation = response
                .headers()
                .get(CONTINUATION_HEADER)
                .and_then(|value| value.to_str().ok())
                .filter(|value| !value.is_empty())
                .map(ToString::to_string);

            let page: Paginated<PipelineRun> = read_json(response).await?;
            debug!("Fetched page of {} runs", page.value.len());
            all_runs.extend(page.value);

            if all_runs.len() >= limit || continuation.is_none() {
                break;
            }
        }

        all_runs.truncate(limit);

        Ok(all_runs)
    }

    /// Fetches a single run with its repository resources.
    pub async fn fetch_pipeline_run(&self, pipeline_id: u64, run_id: u64) -> Result<PipelineRun> {
        let url = self.endpoint(&format!("pipelines/{pipeline_id}/runs/{run_id}"))?;
        self.get_json(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Token;
    use crate::error::PrevUpdaterError;
    use mockito::Matcher;

    fn client_for(server: &mockito::ServerGuard) -> AdoClient {
        AdoClient::new(&server.url(), "org", "proj", Token::from("pat")).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_pipeline_runs_single_page() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/org/proj/_apis/pipelines/12/runs")
            .match_query(Matcher::UrlEncoded("api-version".into(), "7.1".into()))
            .match_header("authorization", "Bearer pat")
            .with_status(200)
            .with_body(
                r#"{"count": 2, "value": [
                    {"id": 2, "name": "1.0.0.2", "state": "completed"},
                    {"id": 1, "name": "1.0.0.1", "state": "completed"}
                ]}"#,
            )
            .create_async()
            .await;

        let runs = client_for(&server).fetch_pipeline_runs(12, 50).await.unwrap();

        mock.assert_async().await;
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].id, 2);
        assert_eq!(runs[1].name, "1.0.0.1");
    }

    #[tokio::test]
    async fn test_fetch_pipeline_runs_follows_continuation_token() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", "/org/proj/_apis/pipelines/12/runs")
            .match_query(Matcher::Exact("api-version=7.1".into()))
            .with_status(200)
            .with_header("x-ms-continuationtoken", "next-page")
            .with_body(r#"{"count": 1, "value": [{"id": 3, "state": "completed"}]}"#)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/org/proj/_apis/pipelines/12/runs")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("api-version".into(), "7.1".into()),
                Matcher::UrlEncoded("continuationToken".into(), "next-page".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"count": 1, "value": [{"id": 2, "state": "completed"}]}"#)
            .create_async()
            .await;

        let runs = client_for(&server).fetch_pipeline_runs(12, 50).await.unwrap();

        first.assert_async().await;
        second.assert_async().await;
        let ids: Vec<u64> = runs.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 2]);
    }

    #[tokio::test]
    async fn test_fetch_pipeline_runs_truncates_to_limit() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/org/proj/_apis/pipelines/12/runs")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("x-ms-continuationtoken", "more")
            .with_body(r#"{"count": 3, "value": [{"id": 3}, {"id": 2}, {"id": 1}]}"#)
            .expect(1)
            .create_async()
            .await;

        let runs = client_for(&server).fetch_pipeline_runs(12, 2).await.unwrap();

        assert_eq!(runs.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_pipeline_run_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/org/proj/_apis/pipelines/12/runs/99")
            .match_query(Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let result = client_for(&server).fetch_pipeline_run(12, 99).await;

        assert!(matches!(result, Err(PrevUpdaterError::NotFound)));
    }

    #[tokio::test]
    async fn test_fetch_pipeline_run_invalid_json() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/org/proj/_apis/pipelines/12/runs/5")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>sign in</html>")
            .create_async()
            .await;

        let result = client_for(&server).fetch_pipeline_run(12, 5).await;

        assert!(matches!(result, Err(PrevUpdaterError::Json(_))));
    }
}
