use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::{Query, State, rejection::QueryRejection},
    http::{
        HeaderMap, StatusCode,
        header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, COOKIE},
    },
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use bytes::Bytes;
use serde::Deserialize;

use crate::{
    application::{
        error::HttpError,
        sitemap::{SitemapError, SitemapRequest, SitemapService},
    },
    config::HEALTH_PATH,
};

use super::middleware::{log_responses, set_request_context};

const SITEMAP_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Clone)]
pub struct HttpState {
    pub sitemap: Arc<SitemapService>,
    /// Cookie whose presence marks a request as authenticated.
    pub session_cookie: Arc<str>,
}

pub fn build_router(state: HttpState) -> Router {
    let path = state.sitemap.config().path.clone();

    Router::new()
        .route(&path, get(sitemap))
        .route(HEALTH_PATH, get(health))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SitemapQuery {
    index: Option<String>,
}

async fn sitemap(
    State(state): State<HttpState>,
    query: Result<Query<SitemapQuery>, QueryRejection>,
    headers: HeaderMap,
) -> Response {
    let anonymous = is_anonymous(&headers, &state.session_cookie);

    match sitemap_body(&state.sitemap, query, anonymous).await {
        Ok(body) => gzip_response(body),
        Err(err) => HttpError::from(err).into_response(),
    }
}

/// The feature flag is checked before the query string is looked at, so a
/// disabled sitemap is "not found" whatever the parameters.
async fn sitemap_body(
    sitemap: &SitemapService,
    query: Result<Query<SitemapQuery>, QueryRejection>,
    anonymous: bool,
) -> Result<Bytes, SitemapError> {
    sitemap.ensure_enabled()?;
    let Query(query) =
        query.map_err(|rejection| SitemapError::InvalidIndex(rejection.body_text()))?;
    let request = SitemapRequest::parse(query.index.as_deref(), anonymous)?;
    sitemap.handle(&request).await
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// A request is anonymous unless it carries credentials or the session cookie.
pub fn is_anonymous(headers: &HeaderMap, session_cookie: &str) -> bool {
    if headers.contains_key(AUTHORIZATION) {
        return false;
    }

    !headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .any(|(name, value)| name.trim() == session_cookie && !value.trim().is_empty())
}

fn gzip_response(body: Bytes) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, SITEMAP_CONTENT_TYPE)
        .header(CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(pairs: &[(axum::http::HeaderName, &'static str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.append(name.clone(), HeaderValue::from_static(value));
        }
        headers
    }

    #[test]
    fn plain_requests_are_anonymous() {
        assert!(is_anonymous(&HeaderMap::new(), "__ac"));
        assert!(is_anonymous(&headers(&[(COOKIE, "theme=dark")]), "__ac"));
    }

    #[test]
    fn session_cookie_marks_authenticated() {
        assert!(!is_anonymous(
            &headers(&[(COOKIE, "theme=dark; __ac=abc123")]),
            "__ac"
        ));
        assert!(!is_anonymous(
            &headers(&[(COOKIE, "theme=dark"), (COOKIE, "__ac=abc123")]),
            "__ac"
        ));
    }

    #[test]
    fn empty_session_cookie_is_anonymous() {
        assert!(is_anonymous(&headers(&[(COOKIE, "__ac=")]), "__ac"));
        assert!(is_anonymous(&headers(&[(COOKIE, "__acx=1")]), "__ac"));
    }

    #[test]
    fn authorization_header_marks_authenticated() {
        assert!(!is_anonymous(
            &headers(&[(AUTHORIZATION, "Basic YWRtaW46c2VjcmV0")]),
            "__ac"
        ));
    }
}
