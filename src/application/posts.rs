//! Origin-side post service backing the `/cache/*` routes.
//!
//! Reads straight from the content source and renders on demand. Callers in
//! front of it cache the results.

use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::application::content::{ContentError, ContentSource};
use crate::application::content_cache::ContentCache;
use crate::application::render::{RenderError, RenderRequest, RenderService};
use crate::domain::posts::{PostsMetadata, RenderedPost};

const POSTS_FILE: &str = "posts.json";

pub struct PostService {
    source: Arc<dyn ContentSource>,
    content: Arc<ContentCache>,
    renderer: Arc<dyn RenderService>,
}

impl PostService {
    pub fn new(
        source: Arc<dyn ContentSource>,
        content: Arc<ContentCache>,
        renderer: Arc<dyn RenderService>,
    ) -> Self {
        Self {
            source,
            content,
            renderer,
        }
    }

    pub fn content(&self) -> &ContentCache {
        &self.content
    }

    /// Reads and parses `{metaDir}/posts.json`.
    pub async fn load_posts_meta(&self) -> Result<PostsMetadata, ContentError> {
        let path = format!("{}/{POSTS_FILE}", self.source.meta_dir().trim_end_matches('/'));
        let raw = self.source.read_file(&path).await?;
        serde_json::from_str(&raw)
            .map_err(|err| ContentError::Decode(format!("{path}: {err}")))
    }

    /// Renders the current document for `(lang, slug)`.
    ///
    /// `version` is the fingerprint the caller expects. A mismatch is logged
    /// and the current document is rendered anyway.
    pub async fn load_render_post(
        &self,
        lang: &str,
        slug: &str,
        version: &str,
    ) -> Result<RenderedPost, ContentError> {
        let posts = self.content.load_posts_metadata().await?;
        let meta = posts.post_meta(lang, slug)?;
        if meta.fingerprint != version {
            warn!(
                target = "application::posts",
                lang,
                slug,
                requested = version,
                current = %meta.fingerprint,
                "Requested post version does not match metadata"
            );
        }

        let path = meta.document_path();
        let markdown = self.source.read_file(&path).await?;
        let request = RenderRequest::new(path, markdown);

        let renderer = Arc::clone(&self.renderer);
        let output = tokio::task::spawn_blocking(move || renderer.render(&request))
            .await
            .map_err(|err| RenderError::Document {
                message: format!("render task failed: {err}"),
            })??;

        debug!(
            target = "application::posts",
            lang,
            slug,
            bytes = output.html.len(),
            "Rendered post"
        );

        Ok(RenderedPost {
            render_time: unix_millis(OffsetDateTime::now_utc()),
            nav_list: output.nav_list(),
            html: output.html,
            meta,
        })
    }
}

fn unix_millis(at: OffsetDateTime) -> i64 {
    (at.unix_timestamp_nanos() / 1_000_000) as i64
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::unix_millis;

    #[test]
    fn millis_since_epoch() {
        assert_eq!(unix_millis(datetime!(2024-01-01 00:00:00.250 UTC)), 1_704_067_200_250);
    }
}
