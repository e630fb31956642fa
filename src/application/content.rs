//! Ports towards content storage and the rendering origin.

use async_trait::async_trait;
use thiserror::Error;

use crate::application::render::RenderError;
use crate::cache::CacheError;
use crate::domain::error::DomainError;
use crate::domain::posts::{PostsMetadata, RenderedPost};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("content `{path}` not found")]
    NotFound { path: String },
    #[error("content fetch failed ({status}): {message}")]
    Fetch { status: u16, message: String },
    #[error("content read failed: {0}")]
    Io(String),
    #[error("content source misconfigured: {0}")]
    Configuration(String),
}

impl SourceError {
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub fn fetch(status: u16, message: impl Into<String>) -> Self {
        Self::Fetch {
            status,
            message: message.into(),
        }
    }
}

/// Read-only access to the content tree that holds posts and metadata.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Directory, relative to the content root, that holds `posts.json`.
    fn meta_dir(&self) -> &str;

    async fn read_file(&self, path: &str) -> Result<String, SourceError>;
}

/// Failure of any content operation, shared between coalesced callers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContentError {
    #[error("{0}")]
    NotFound(String),
    #[error("upstream request failed: {0}")]
    Upstream(String),
    #[error("render failed: {0}")]
    Render(#[from] RenderError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("content could not be decoded: {0}")]
    Decode(String),
}

impl ContentError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ContentError::NotFound(_))
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream(message.into())
    }
}

impl From<SourceError> for ContentError {
    fn from(error: SourceError) -> Self {
        match error {
            SourceError::NotFound { .. } => ContentError::NotFound(error.to_string()),
            other => ContentError::Upstream(other.to_string()),
        }
    }
}

impl From<DomainError> for ContentError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::NotFound { .. } => ContentError::NotFound(error.to_string()),
            DomainError::Validation { .. } => ContentError::Decode(error.to_string()),
        }
    }
}

/// Same-origin endpoints that produce cacheable content on a miss.
#[async_trait]
pub trait PostsOrigin: Send + Sync {
    async fn fetch_posts_metadata(&self) -> Result<PostsMetadata, ContentError>;

    async fn fetch_rendered_post(
        &self,
        lang: &str,
        slug: &str,
        fingerprint: &str,
    ) -> Result<RenderedPost, ContentError>;
}
