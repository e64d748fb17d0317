//! Local web UI for streaming worker logs.
//!
//! Serves the viewer page on loopback and proxies the page's API calls
//! to the Cloudflare API through `/fetch/<host>/<path>`. The page
//! creates and reads tail sessions itself through that passthrough; the
//! server holds no tail state.

use anyhow::{Context, Result};
use axum::body::{Body, Bytes};
use axum::extract::{Path, RawQuery, State};
use axum::http::{header, HeaderMap, HeaderName, Method, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{any, get};
use axum::Router;
use std::fmt::Display;
use std::net::SocketAddr;
use tokio::runtime::Runtime;
use tracing::{debug, info};
use url::Url;

const WEBTAIL_PAGE: &str = include_str!("webtail.html");

/// Fixed upstream for the viewer application bundle.
const APP_JS_URL: &str = "https://static.edgeflare.dev/webtail/app.js";

/// The only host `/fetch/` may proxy to.
const ALLOWED_FETCH_HOST: &str = "api.cloudflare.com";

/// Request headers with this prefix are stripped before forwarding.
const STRIPPED_HEADER_PREFIX: &str = "cf-";

#[derive(Clone)]
struct AppState {
    http: reqwest::Client,
}

/// Serve the tail UI on 127.0.0.1:`port` until interrupted.
pub fn serve(port: u16) -> Result<()> {
    let runtime = Runtime::new().context("Failed to start tail server runtime")?;
    runtime.block_on(run(port))
}

async fn run(port: u16) -> Result<()> {
    let state = AppState {
        http: reqwest::Client::new(),
    };

    let app = Router::new()
        .route("/", get(handle_index))
        .route("/app.js", get(handle_app_js))
        .route("/fetch/*target", any(handle_fetch))
        .with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind tail server to {addr}"))?;
    info!("Tail UI listening on http://{addr}");

    axum::serve(listener, app)
        .await
        .context("Tail server terminated")?;
    Ok(())
}

async fn handle_index() -> Html<&'static str> {
    Html(WEBTAIL_PAGE)
}

async fn handle_app_js(State(state): State<AppState>) -> Response {
    let upstream = match state.http.get(APP_JS_URL).send().await {
        Ok(upstream) => upstream,
        Err(err) => return gateway_error(err),
    };

    if !upstream.status().is_success() {
        return (
            StatusCode::BAD_GATEWAY,
            format!("Upstream asset returned {}", upstream.status()),
        )
            .into_response();
    }

    match upstream.bytes().await {
        Ok(bytes) => (
            [(header::CONTENT_TYPE, "application/javascript")],
            bytes.to_vec(),
        )
            .into_response(),
        Err(err) => gateway_error(err),
    }
}

async fn handle_fetch(
    State(state): State<AppState>,
    Path(target): Path<String>,
    RawQuery(query): RawQuery,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let url = match parse_fetch_target(&target, query.as_deref()) {
        Ok(url) => url,
        Err(reason) => return (StatusCode::BAD_REQUEST, reason).into_response(),
    };
    debug!("proxying {method} {url}");

    let upstream = state
        .http
        .request(method, url)
        .headers(filter_request_headers(&headers))
        .body(body.to_vec())
        .send()
        .await;

    let upstream = match upstream {
        Ok(upstream) => upstream,
        Err(err) => return gateway_error(err),
    };

    let status = upstream.status();
    let upstream_headers = upstream.headers().clone();
    let bytes = match upstream.bytes().await {
        Ok(bytes) => bytes,
        Err(err) => return gateway_error(err),
    };

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    for (name, value) in upstream_headers.iter() {
        if forward_response_header(name) {
            response.headers_mut().append(name.clone(), value.clone());
        }
    }
    response
}

fn gateway_error(err: impl Display) -> Response {
    (StatusCode::BAD_GATEWAY, format!("Upstream error: {err}")).into_response()
}

/// Turn the `/fetch/<host>/<path>` remainder into the upstream URL,
/// rejecting hosts other than the Cloudflare API.
fn parse_fetch_target(target: &str, query: Option<&str>) -> Result<Url, String> {
    let (host, rest) = match target.split_once('/') {
        Some((host, rest)) => (host, rest),
        None => (target, ""),
    };

    if !host.eq_ignore_ascii_case(ALLOWED_FETCH_HOST) {
        return Err(format!("Fetch target '{host}' is not allowed"));
    }

    let mut url = format!("https://{ALLOWED_FETCH_HOST}/{rest}");
    if let Some(query) = query {
        url.push('?');
        url.push_str(query);
    }

    Url::parse(&url).map_err(|err| format!("Bad fetch target: {err}"))
}

fn filter_request_headers(headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = HeaderMap::new();
    for (name, value) in headers {
        if forward_request_header(name) {
            forwarded.append(name.clone(), value.clone());
        }
    }
    forwarded
}

/// Header names are normalized to lowercase, so prefix checks here are
/// case-insensitive with respect to the wire form.
fn forward_request_header(name: &HeaderName) -> bool {
    let name = name.as_str();
    !name.starts_with(STRIPPED_HEADER_PREFIX)
        && name != "host"
        && name != "connection"
        && name != "content-length"
}

fn forward_response_header(name: &HeaderName) -> bool {
    let name = name.as_str();
    name != "connection" && name != "transfer-encoding" && name != "content-length"
}
