//! Content cache orchestrator.
//!
//! Page-facing entry point for posts metadata and rendered posts. Misses are
//! filled from the same-origin `/cache/*` endpoints through [`PostsOrigin`].

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::application::content::{ContentError, PostsOrigin};
use crate::cache::keys::{POSTS_META_KEY, rendered_post_key};
use crate::cache::{CacheOptions, TieredCache};
use crate::domain::posts::{HomePost, PostsMetadata, RenderedPost};

const POSTS_META_TTL: Duration = Duration::from_secs(60);
const POSTS_META_REMOTE_TTL: Duration = Duration::from_secs(7 * 24 * 3600);
const RENDERED_POST_TTL: Duration = Duration::from_secs(24 * 3600);

pub struct ContentCache {
    cache: TieredCache,
    origin: Arc<dyn PostsOrigin>,
}

impl ContentCache {
    pub fn new(cache: TieredCache, origin: Arc<dyn PostsOrigin>) -> Self {
        Self { cache, origin }
    }

    pub fn cache(&self) -> &TieredCache {
        &self.cache
    }

    /// Posts metadata: 60s in memory, 7 days in the remote tier.
    pub async fn load_posts_metadata(&self) -> Result<PostsMetadata, ContentError> {
        let origin = Arc::clone(&self.origin);
        self.cache
            .with_cache(
                CacheOptions::new(POSTS_META_KEY, POSTS_META_TTL).with_remote(POSTS_META_REMOTE_TTL),
                move || async move { origin.fetch_posts_metadata().await },
            )
            .await
    }

    /// Rendered post keyed by its content fingerprint; memory tier only.
    pub async fn load_rendered_post(
        &self,
        lang: &str,
        slug: &str,
    ) -> Result<RenderedPost, ContentError> {
        let posts = self.load_posts_metadata().await?;
        let meta = posts.post_meta(lang, slug)?;
        let fingerprint = meta.fingerprint;

        let origin = Arc::clone(&self.origin);
        let (lang_owned, slug_owned, fingerprint_owned) =
            (lang.to_string(), slug.to_string(), fingerprint.clone());
        let post = self
            .cache
            .with_cache(
                CacheOptions::new(rendered_post_key(lang, slug, &fingerprint), RENDERED_POST_TTL),
                move || async move {
                    origin
                        .fetch_rendered_post(&lang_owned, &slug_owned, &fingerprint_owned)
                        .await
                },
            )
            .await?;

        if post.meta.fingerprint != fingerprint {
            warn!(
                target = "application::content_cache",
                lang,
                slug,
                expected = %fingerprint,
                rendered = %post.meta.fingerprint,
                "Rendered post fingerprint differs from metadata"
            );
        }

        Ok(post)
    }

    /// Listing for a language's home page, built on cached metadata.
    pub async fn load_home_posts(&self, lang: &str) -> Result<Vec<HomePost>, ContentError> {
        let posts = self.load_posts_metadata().await?;
        Ok(posts.home_posts(lang))
    }

    /// Drops posts metadata from both tiers.
    pub async fn purge_metadata(&self) {
        self.cache.purge(POSTS_META_KEY, true).await;
        info!(
            target = "application::content_cache",
            key = POSTS_META_KEY,
            "Purged posts metadata"
        );
    }
}
