//! HTTP surface of the gateway.
//!
//! Every GET that reaches the fallback route is resolved against the
//! configured origin and dispatched through the cache manager, which
//! applies the delivery strategy chosen by route classification.
//! Non-GET requests are proxied to the origin untouched and never
//! cached.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use url::Url;

use hearth_client::{CacheManager, Served};
use hearth_core::{AppConfig, Error};

use crate::error::GatewayError;
use crate::relay;

/// Shared handler state; cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub manager: CacheManager,
    pub origin: Url,
    pub config: Arc<AppConfig>,
    pub http: reqwest::Client,
}

/// Build the gateway router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(relay::health))
        .route("/api/send-email", post(relay::send_email))
        .fallback(dispatch)
        .with_state(state)
}

/// Fallback handler: cached delivery for GET, pass-through otherwise.
async fn dispatch(State(app): State<AppState>, req: Request) -> Result<Response, GatewayError> {
    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());
    let upstream = resolve_upstream(&app.origin, &path_and_query)?;

    if req.method() == axum::http::Method::GET {
        let served = app.manager.handle(upstream.as_str()).await?;
        return Ok(served_to_response(served));
    }

    pass_through(&app, req, upstream).await
}

/// Map a gateway-relative path to the origin URL it shadows.
fn resolve_upstream(origin: &Url, path_and_query: &str) -> Result<Url, Error> {
    origin
        .join(path_and_query)
        .map_err(|e| Error::InvalidUrl(format!("{path_and_query}: {e}")))
}

fn served_to_response(served: Served) -> Response {
    let mut builder = Response::builder().status(served.status);
    if let Some(ct) = &served.content_type {
        builder = builder.header(header::CONTENT_TYPE, ct);
    }
    match builder.body(Body::from(served.body)) {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "failed to build response");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Hop-by-hop headers are connection-scoped and must not cross the
/// proxy. Host and content-length are recomputed by the HTTP stacks on
/// each side.
fn is_hop_by_hop(name: &header::HeaderName) -> bool {
    matches!(
        name.as_str(),
        "host"
            | "connection"
            | "keep-alive"
            | "content-length"
            | "transfer-encoding"
            | "upgrade"
            | "te"
            | "trailer"
            | "proxy-authenticate"
            | "proxy-authorization"
    )
}

/// End-to-end headers carried across the proxy, repeated values kept.
fn forwardable_headers(headers: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::new();
    for (name, value) in headers {
        if is_hop_by_hop(name) {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}

/// Forward a non-GET request to the origin verbatim, no caching.
async fn pass_through(app: &AppState, req: Request, upstream: Url) -> Result<Response, GatewayError> {
    let (parts, body) = req.into_parts();
    let bytes = axum::body::to_bytes(body, app.config.max_bytes)
        .await
        .map_err(|e| GatewayError::Upstream(format!("request body: {e}")))?;

    let upstream_response = app
        .http
        .request(parts.method, upstream.as_str())
        .headers(forwardable_headers(&parts.headers))
        .body(bytes)
        .send()
        .await
        .map_err(|e| GatewayError::Upstream(e.to_string()))?;

    let status = upstream_response.status().as_u16();
    let headers = forwardable_headers(upstream_response.headers());
    let body = upstream_response
        .bytes()
        .await
        .map_err(|e| GatewayError::Upstream(e.to_string()))?;

    let mut builder = Response::builder().status(status);
    for (name, value) in &headers {
        builder = builder.header(name.clone(), value.clone());
    }
    builder
        .body(Body::from(body))
        .map_err(|e| GatewayError::Upstream(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Bytes, to_bytes};
    use hearth_client::ServedSource;

    #[test]
    fn test_forwardable_headers_carries_end_to_end_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, "session=abc".parse().unwrap());
        headers.insert(header::AUTHORIZATION, "Bearer token".parse().unwrap());
        headers.insert(header::CONTENT_TYPE, "application/json".parse().unwrap());
        headers.insert(header::ACCEPT_LANGUAGE, "en-AU".parse().unwrap());

        let forwarded = forwardable_headers(&headers);

        assert_eq!(forwarded.get(header::COOKIE).unwrap(), "session=abc");
        assert_eq!(forwarded.get(header::AUTHORIZATION).unwrap(), "Bearer token");
        assert_eq!(forwarded.get(header::CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(forwarded.get(header::ACCEPT_LANGUAGE).unwrap(), "en-AU");
    }

    #[test]
    fn test_forwardable_headers_drops_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "gateway.local".parse().unwrap());
        headers.insert(header::CONNECTION, "keep-alive".parse().unwrap());
        headers.insert(header::CONTENT_LENGTH, "42".parse().unwrap());
        headers.insert(header::TRANSFER_ENCODING, "chunked".parse().unwrap());
        headers.insert(header::COOKIE, "session=abc".parse().unwrap());

        let forwarded = forwardable_headers(&headers);

        assert_eq!(forwarded.len(), 1);
        assert!(forwarded.get(header::HOST).is_none());
        assert!(forwarded.get(header::CONNECTION).is_none());
        assert!(forwarded.get(header::CONTENT_LENGTH).is_none());
        assert!(forwarded.get(header::TRANSFER_ENCODING).is_none());
    }

    #[test]
    fn test_forwardable_headers_keeps_repeated_values() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, "a=1".parse().unwrap());
        headers.append(header::COOKIE, "b=2".parse().unwrap());

        let forwarded = forwardable_headers(&headers);
        let values: Vec<_> = forwarded.get_all(header::COOKIE).iter().collect();
        assert_eq!(values, vec!["a=1", "b=2"]);
    }

    #[test]
    fn test_resolve_upstream_path_and_query() {
        let origin = Url::parse("http://127.0.0.1:3000").unwrap();
        let url = resolve_upstream(&origin, "/api/services?page=2").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:3000/api/services?page=2");
    }

    #[test]
    fn test_resolve_upstream_root() {
        let origin = Url::parse("http://127.0.0.1:3000").unwrap();
        let url = resolve_upstream(&origin, "/").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:3000/");
    }

    #[tokio::test]
    async fn test_served_to_response_carries_status_and_content_type() {
        let served = Served {
            status: 200,
            content_type: Some("text/html".to_string()),
            body: Bytes::from_static(b"<html>"),
            source: ServedSource::Cache,
        };

        let response = served_to_response(served);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), "text/html");

        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(body, Bytes::from_static(b"<html>"));
    }

    #[tokio::test]
    async fn test_served_to_response_without_content_type() {
        let served =
            Served { status: 404, content_type: None, body: Bytes::new(), source: ServedSource::Network };

        let response = served_to_response(served);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().get(header::CONTENT_TYPE).is_none());
    }
}
