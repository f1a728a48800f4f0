use log::{debug, info};
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use url::Url;

use crate::auth::Token;
use crate::error::{PrevUpdaterError, Result};

pub(super) const API_VERSION: &str = "7.1";
pub(super) const CONTINUATION_HEADER: &str = "x-ms-continuationtoken";
const JSON_PATCH: &str = "application/json-patch+json";

/// Thin REST wrapper around one Azure DevOps project.
pub struct AdoClient {
    client: Client,
    /// `{base}/{organization}/{project}/`
    project_url: Url,
    token: Token,
}

impl AdoClient {
    /// Creates a client scoped to `organization/project`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot be parsed or cannot carry a path.
    pub fn new(base_url: &str, organization: &str, project: &str, token: Token) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("prev-updater/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PrevUpdaterError::Config(format!("Failed to create HTTP client: {e}")))?;

        let mut project_url = Url::parse(base_url)
            .map_err(|e| PrevUpdaterError::Config(format!("Invalid base URL: {e}")))?;

        project_url
            .path_segments_mut()
            .map_err(|()| PrevUpdaterError::Config(format!("Base URL cannot be a base: {base_url}")))?
            .pop_if_empty()
            .extend([organization, project, ""]);

        Ok(Self {
            client,
            project_url,
            token,
        })
    }

    /// Web URL of the project, used to build links to work items and runs.
    pub fn project_url(&self) -> &Url {
        &self.project_url
    }

    /// Builds `_apis/{route}` with the pinned `api-version` query parameter.
    pub(super) fn endpoint(&self, route: &str) -> Result<Url> {
        let mut url = self
            .project_url
            .join(&format!("_apis/{route}"))
            .map_err(|e| PrevUpdaterError::Config(format!("Invalid API route {route}: {e}")))?;
        url.query_pairs_mut().append_pair("api-version", API_VERSION);
        Ok(url)
    }

    fn auth_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.bearer_auth(self.token.as_str())
    }

    /// Sends a GET and returns the raw response once its status is a success.
    pub(super) async fn get(&self, url: Url) -> Result<Response> {
        info!("Send request GET {url}");
        let response = self.auth_request(self.client.get(url)).send().await?;
        ensure_success(response)
    }

    pub(super) async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self.get(url).await?;
        read_json(response).await
    }

    /// Sends a JSON-patch document.
    pub(super) async fn patch_json<B: serde::Serialize + ?Sized>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<Response> {
        let body = serde_json::to_vec(body)?;
        info!("Send request PATCH {url}");
        debug!("PATCH body: {}", String::from_utf8_lossy(&body));

        let response = self
            .auth_request(self.client.patch(url))
            .header(CONTENT_TYPE, HeaderValue::from_static(JSON_PATCH))
            .body(body)
            .send()
            .await?;
        ensure_success(response)
    }
}

/// Maps any non-2xx status onto the fixed error kinds.
pub(crate) fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(PrevUpdaterError::from_status(status))
    }
}

/// Reads the whole body and decodes it, so decode failures surface as JSON errors.
pub(super) async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}
