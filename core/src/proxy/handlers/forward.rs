//! Request dispatch
//! Matched requests are rewritten and forwarded upstream; everything
//! else falls through to the static file service.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap, HeaderName, StatusCode},
    response::{IntoResponse, Response},
};
use tower::ServiceExt;
use tracing::{debug, warn};

use crate::proxy::rule::ProxyRule;
use crate::proxy::server::AppState;

const HOP_BY_HOP_HEADERS: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP_HEADERS.contains(&name.as_str())
}

/// The inbound request declares a body worth forwarding.
fn has_request_body(headers: &HeaderMap) -> bool {
    if headers.contains_key(header::TRANSFER_ENCODING) {
        return true;
    }
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .is_some_and(|len| len > 0)
}

/// Fallback handler. Every request lands here so rule matching sees
/// all paths.
pub async fn handle_request(State(state): State<AppState>, request: Request) -> Response {
    let path = request.uri().path().to_string();

    if let Some(rule) = state.rules.find(&path) {
        return proxy_to_upstream(&state, rule, request).await;
    }

    match state.static_files.clone().oneshot(request).await {
        Ok(response) => response.map(Body::new),
        Err(err) => match err {},
    }
}

async fn proxy_to_upstream(state: &AppState, rule: &ProxyRule, request: Request) -> Response {
    let (parts, body) = request.into_parts();

    let path = parts.uri.path();
    let query = parts.uri.query();
    let url = rule.upstream_url(&rule.rewrite_path(path), query);

    debug!("{} {} -> {}", parts.method, path, url);

    // Host is handled below per change_origin; Content-Length is
    // recomputed by the client for the streamed body.
    let mut headers = HeaderMap::with_capacity(parts.headers.len());
    for (name, value) in parts.headers.iter() {
        if is_hop_by_hop(name) || *name == header::HOST || *name == header::CONTENT_LENGTH {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }

    if !rule.change_origin() {
        if let Some(host) = parts.headers.get(header::HOST) {
            headers.insert(header::HOST, host.clone());
        }
    }

    let body = if has_request_body(&parts.headers) {
        Some(reqwest::Body::wrap_stream(body.into_data_stream()))
    } else {
        None
    };

    let upstream_response = match state
        .upstream
        .forward(rule, parts.method, &url, headers, body)
        .await
    {
        Ok(response) => response,
        Err(e) if e.is_timeout() => {
            warn!("Upstream for {} timed out: {}", rule.prefix(), e);
            return (
                StatusCode::GATEWAY_TIMEOUT,
                format!("upstream request timed out: {e}"),
            )
                .into_response();
        }
        Err(e) => {
            warn!("Upstream for {} failed: {}", rule.prefix(), e);
            return (
                StatusCode::BAD_GATEWAY,
                format!("upstream request failed: {e}"),
            )
                .into_response();
        }
    };

    relay_response(upstream_response)
}

/// Relay status, headers, and body stream unmodified.
fn relay_response(upstream: reqwest::Response) -> Response {
    let status = upstream.status();

    let mut headers = HeaderMap::with_capacity(upstream.headers().len());
    for (name, value) in upstream.headers().iter() {
        if is_hop_by_hop(name) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}
