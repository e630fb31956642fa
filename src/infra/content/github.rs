use async_trait::async_trait;
use reqwest::{
    Client, StatusCode,
    header::{ACCEPT, AUTHORIZATION, USER_AGENT},
};
use tracing::{debug, error};
use url::Url;

use crate::application::content::{ContentSource, SourceError};

pub const GITHUB_META_DIR: &str = ".meta";

const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw+json";
const API_VERSION_HEADER: &str = "X-GitHub-Api-Version";
const API_VERSION: &str = "2022-11-28";
const CLIENT_USER_AGENT: &str = "folio";

/// Connection details for the GitHub contents API.
#[derive(Debug, Clone)]
pub struct GitHubSourceConfig {
    pub api_url: String,
    /// `owner/name`.
    pub repo: String,
    /// Branch or tag the content is pinned to.
    pub reference: String,
    pub token: Option<String>,
}

/// Content tree stored in a GitHub repository, fetched as raw files.
#[derive(Debug, Clone)]
pub struct GitHubSource {
    client: Client,
    config: GitHubSourceConfig,
}

impl GitHubSource {
    pub fn new(client: Client, config: GitHubSourceConfig) -> Self {
        Self { client, config }
    }

    fn contents_url(&self, path: &str) -> Result<Url, SourceError> {
        let mut url = Url::parse(&self.config.api_url).map_err(|err| {
            SourceError::Configuration(format!("invalid api url `{}`: {err}", self.config.api_url))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                SourceError::Configuration(format!("api url `{}` cannot be a base", self.config.api_url))
            })?
            .pop_if_empty()
            .push("repos")
            .extend(self.config.repo.split('/').filter(|segment| !segment.is_empty()))
            .push("contents")
            .extend(path.split('/').filter(|segment| !segment.is_empty()));
        url.query_pairs_mut().append_pair("ref", &self.config.reference);
        Ok(url)
    }
}

#[async_trait]
impl ContentSource for GitHubSource {
    fn meta_dir(&self) -> &str {
        GITHUB_META_DIR
    }

    async fn read_file(&self, path: &str) -> Result<String, SourceError> {
        let url = self.contents_url(path)?;
        debug!(target = "folio::content::github", url = %url, "Fetching content file");

        let mut request = self
            .client
            .get(url)
            .header(ACCEPT, RAW_MEDIA_TYPE)
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .header(API_VERSION_HEADER, API_VERSION);
        if let Some(token) = self.config.token.as_deref() {
            request = request.header(AUTHORIZATION, format!("token {token}"));
        }

        let response = request
            .send()
            .await
            .map_err(|err| SourceError::fetch(0, err.to_string()))?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(SourceError::not_found(path));
        }
        if !status.is_success() {
            error!(
                target = "folio::content::github",
                path,
                status = status.as_u16(),
                "Failed to fetch content"
            );
            return Err(SourceError::fetch(
                status.as_u16(),
                status.canonical_reason().unwrap_or("unexpected status"),
            ));
        }

        response
            .text()
            .await
            .map_err(|err| SourceError::fetch(status.as_u16(), err.to_string()))
    }
}
