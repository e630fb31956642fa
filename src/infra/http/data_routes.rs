//! Page data endpoints served through the content cache.

use axum::{
    Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};

use serde::Serialize;

use crate::application::error::HttpError;
use crate::domain::posts::{AlternateLink, RenderedPost};

use super::HttpState;

/// Rendered post plus links to its other languages.
#[derive(Debug, Serialize)]
struct PostPage {
    #[serde(flatten)]
    post: RenderedPost,
    alternates: Vec<AlternateLink>,
}

pub(super) async fn home_posts(
    State(state): State<HttpState>,
    Path(lang): Path<String>,
) -> Response {
    match state.content.load_home_posts(&lang).await {
        Ok(posts) => Json(posts).into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn post(
    State(state): State<HttpState>,
    Path((lang, slug)): Path<(String, String)>,
) -> Response {
    match state.content.load_rendered_post(&lang, &slug).await {
        Ok(post) => {
            let alternates = post.meta.alternates(state.site_url.as_str());
            Json(PostPage { post, alternates }).into_response()
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}
