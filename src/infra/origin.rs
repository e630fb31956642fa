//! Same-origin HTTP client for the `/cache/*` endpoints.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::application::content::{ContentError, PostsOrigin};
use crate::domain::posts::{PostsMetadata, RenderedPost};

/// Fills cache misses by calling this service's own origin routes.
#[derive(Debug, Clone)]
pub struct HttpOrigin {
    client: Client,
    base: Url,
}

impl HttpOrigin {
    pub fn new(client: Client, base: Url) -> Self {
        Self { client, base }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ContentError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ContentError::upstream(format!("origin `{}` cannot be a base", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn fetch_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ContentError> {
        debug!(target = "folio::origin", url = %url, "Requesting origin");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| ContentError::upstream(format!("{url}: {err}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ContentError::NotFound(format!("origin returned 404 for {url}")));
        }
        if !status.is_success() {
            return Err(ContentError::upstream(format!(
                "origin returned {} for {url}",
                status.as_u16()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|err| ContentError::upstream(format!("{url}: {err}")))?;
        serde_json::from_str(&body).map_err(|err| ContentError::Decode(format!("{url}: {err}")))
    }
}

#[async_trait]
impl PostsOrigin for HttpOrigin {
    async fn fetch_posts_metadata(&self) -> Result<PostsMetadata, ContentError> {
        let url = self.endpoint(&["cache", "meta"])?;
        self.fetch_json(url).await
    }

    async fn fetch_rendered_post(
        &self,
        lang: &str,
        slug: &str,
        fingerprint: &str,
    ) -> Result<RenderedPost, ContentError> {
        let url = self.endpoint(&["cache", "post", lang, slug, fingerprint])?;
        self.fetch_json(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin(base: &str) -> HttpOrigin {
        HttpOrigin::new(Client::new(), Url::parse(base).expect("base url"))
    }

    #[test]
    fn endpoints_extend_base_path() {
        let meta = origin("http://127.0.0.1:3000")
            .endpoint(&["cache", "meta"])
            .expect("meta url");
        assert_eq!(meta.as_str(), "http://127.0.0.1:3000/cache/meta");

        let post = origin("https://blog.example/app/")
            .endpoint(&["cache", "post", "zh", "hello world", "abc"])
            .expect("post url");
        assert_eq!(
            post.as_str(),
            "https://blog.example/app/cache/post/zh/hello%20world/abc"
        );
    }

    #[test]
    fn non_hierarchical_base_is_rejected() {
        let err = origin("mailto:someone@example.com")
            .endpoint(&["cache", "meta"])
            .expect_err("cannot be a base");
        assert!(matches!(err, ContentError::Upstream(_)));
    }
}
