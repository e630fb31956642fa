mod cache_routes;
mod data_routes;
mod middleware;

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

use url::Url;

use crate::application::{content_cache::ContentCache, posts::PostService};

use self::middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct HttpState {
    pub posts: Arc<PostService>,
    pub content: Arc<ContentCache>,
    pub purge_secret: Option<String>,
    /// Base for absolute links handed to page components.
    pub site_url: Url,
}

pub fn build_router(state: HttpState) -> Router {
    let cache_routes = Router::new()
        .route("/cache/meta", get(cache_routes::posts_meta))
        .route("/cache/post/{*rest}", get(cache_routes::rendered_post))
        .route("/cache/purge/{secret}", post(cache_routes::purge));

    let data_routes = Router::new()
        .route("/data/home/{lang}", get(data_routes::home_posts))
        .route("/data/posts/{lang}/{slug}", get(data_routes::post));

    cache_routes
        .merge(data_routes)
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
