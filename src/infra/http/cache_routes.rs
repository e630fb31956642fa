//! Origin endpoints behind the content cache.
//!
//! These read the content source directly and render on demand; CDN headers
//! let edges hold the responses.

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header::CACHE_CONTROL},
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;
use tracing::info;

use crate::application::error::{ErrorReport, HttpError};

use super::HttpState;

pub(super) const META_CACHE_CONTROL: &str =
    "public, max-age=60, s-maxage=60, stale-while-revalidate=60";
pub(super) const POST_CACHE_CONTROL: &str =
    "public, max-age=86400, s-maxage=86400, stale-while-revalidate=604800";

pub(super) async fn posts_meta(State(state): State<HttpState>) -> Response {
    match state.posts.load_posts_meta().await {
        Ok(posts) => with_cache_control(Json(posts).into_response(), META_CACHE_CONTROL),
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn rendered_post(
    State(state): State<HttpState>,
    Path(rest): Path<String>,
) -> Response {
    let segments: Vec<&str> = rest.split('/').collect();
    let [lang, slug, version] = segments.as_slice() else {
        return HttpError::new(
            "infra::http::cache_routes::rendered_post",
            StatusCode::BAD_REQUEST,
            "Bad request",
            format!("expected `lang/slug/version`, got `{rest}`"),
        )
        .into_response();
    };

    match state.posts.load_render_post(lang, slug, version).await {
        Ok(post) => with_cache_control(Json(post).into_response(), POST_CACHE_CONTROL),
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn purge(State(state): State<HttpState>, Path(secret): Path<String>) -> Response {
    if !secret_matches(state.purge_secret.as_deref(), &secret) {
        let mut response = (StatusCode::FORBIDDEN, "Forbidden").into_response();
        ErrorReport::from_message(
            "infra::http::cache_routes::purge",
            StatusCode::FORBIDDEN,
            "purge secret rejected",
        )
        .attach(&mut response);
        return response;
    }

    state.content.purge_metadata().await;
    info!(target = "folio::http::cache", "Posts metadata purged on request");
    (StatusCode::OK, "OK").into_response()
}

fn secret_matches(expected: Option<&str>, provided: &str) -> bool {
    match expected {
        Some(expected) => bool::from(expected.as_bytes().ct_eq(provided.as_bytes())),
        None => false,
    }
}

fn with_cache_control(mut response: Response, value: &'static str) -> Response {
    response
        .headers_mut()
        .insert(CACHE_CONTROL, HeaderValue::from_static(value));
    response
}

#[cfg(test)]
mod tests {
    use super::secret_matches;

    #[test]
    fn purge_secret_comparison() {
        assert!(secret_matches(Some("s3cret"), "s3cret"));
        assert!(!secret_matches(Some("s3cret"), "s3cre"));
        assert!(!secret_matches(Some("s3cret"), ""));
        assert!(!secret_matches(None, "anything"));
        assert!(!secret_matches(None, ""));
    }
}
