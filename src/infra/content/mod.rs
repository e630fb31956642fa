//! Content source adapters.

mod github;
mod local;

use std::sync::Arc;

use reqwest::Client;
use tracing::info;

pub use github::{GITHUB_META_DIR, GitHubSource, GitHubSourceConfig};
pub use local::{LOCAL_META_DIR, LocalSource};

use crate::application::content::ContentSource;
use crate::config::{ContentBackend, Settings};
use crate::infra::error::InfraError;

/// Picks the content adapter the settings call for.
pub fn build_source(
    settings: &Settings,
    client: Client,
) -> Result<Arc<dyn ContentSource>, InfraError> {
    let backend = settings
        .content_backend()
        .map_err(|err| InfraError::configuration(err.to_string()))?;

    match backend {
        ContentBackend::Local(root) => {
            info!(
                target = "folio::content",
                root = %root.display(),
                "Serving content from local directory"
            );
            Ok(Arc::new(LocalSource::new(root)))
        }
        ContentBackend::GitHub { repo } => {
            let github = &settings.content.github;
            info!(
                target = "folio::content",
                repo = %repo,
                reference = %github.reference,
                "Serving content from GitHub"
            );
            Ok(Arc::new(GitHubSource::new(
                client,
                GitHubSourceConfig {
                    api_url: github.api_url.clone(),
                    repo,
                    reference: github.reference.clone(),
                    token: github.token.clone(),
                },
            )))
        }
    }
}
