use log::info;
use reqwest::Client;
use url::Url;

use crate::error::{PrevUpdaterError, Result};
use crate::providers::ado::ensure_success;
use crate::report::RunSummary;
use crate::workflow::SummarySink;

/// Posts the run summary to an incoming webhook.
pub struct WebhookClient {
    client: Client,
    url: Url,
}

impl WebhookClient {
    pub fn new(url: &str) -> Result<Self> {
        let url = Url::parse(url)
            .map_err(|e| PrevUpdaterError::Config(format!("Invalid webhook URL {url}: {e}")))?;
        let client = Client::builder()
            .user_agent(concat!("prev-updater/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PrevUpdaterError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, url })
    }
}

impl SummarySink for WebhookClient {
    async fn post_summary(&self, summary: &RunSummary) -> Result<()> {
        info!("Send request POST {}", self.url);
        let response = self
            .client
            .post(self.url.clone())
            .json(summary)
            .send()
            .await?;
        ensure_success(response)?;
        Ok(())
    }
}
