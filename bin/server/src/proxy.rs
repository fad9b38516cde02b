//! Reverse proxy to the protected backend.
//!
//! Requests are streamed through unchanged apart from the path being joined
//! onto the backend origin and the forwarding headers. Bodies are never
//! buffered in either direction.
//!
//! Protocol upgrades are not passed through. `Upgrade` is dropped like any
//! other hop-by-hop header, so a WebSocket handshake reaches the backend as a
//! plain request.

use crate::auth::AppState;
use crate::pages;
use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, Uri, header},
    response::Response,
};
use guild_gate_core::Result;
use reqwest::Url;
use std::fmt;
use std::net::SocketAddr;

/// Headers that describe a single connection and must not be forwarded.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_FORWARDED_HOST: &str = "x-forwarded-host";

/// Proxy errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyError {
    /// The backend could not be reached or dropped the connection.
    BackendUnreachable { details: String },
}

impl fmt::Display for ProxyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BackendUnreachable { details } => {
                write!(f, "backend unreachable: {}", details)
            }
        }
    }
}

impl std::error::Error for ProxyError {}

/// Forwards requests to a fixed backend origin.
pub struct ProxyForwarder {
    http: reqwest::Client,
    target: Url,
    target_host: HeaderValue,
}

impl ProxyForwarder {
    /// Creates a forwarder for `target`.
    ///
    /// `http` must not follow redirects, so backend redirects reach the
    /// browser as-is.
    ///
    /// # Errors
    ///
    /// Returns an error if the target has no host.
    pub fn new(http: reqwest::Client, target: Url) -> Result<Self, ProxyError> {
        let host = match (target.host_str(), target.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(ProxyError::BackendUnreachable {
                    details: format!("backend URL '{}' has no host", target),
                }
                .into());
            }
        };
        let target_host = HeaderValue::from_str(&host).map_err(|e| ProxyError::BackendUnreachable {
            details: e.to_string(),
        })?;

        Ok(Self {
            http,
            target,
            target_host,
        })
    }

    /// Returns the backend origin.
    #[must_use]
    pub fn target(&self) -> &Url {
        &self.target
    }

    /// Joins the inbound path and query onto the backend origin.
    fn upstream_url(&self, uri: &Uri) -> Url {
        let mut url = self.target.clone();
        let base = self.target.path().trim_end_matches('/');
        url.set_path(&format!("{base}{}", uri.path()));

        let query = match (self.target.query(), uri.query()) {
            (Some(base), Some(inbound)) => Some(format!("{base}&{inbound}")),
            (Some(base), None) => Some(base.to_string()),
            (None, inbound) => inbound.map(str::to_string),
        };
        url.set_query(query.as_deref());
        url
    }

    /// Forwards `request` to the backend and streams back its response.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached.
    pub async fn forward(&self, request: Request) -> Result<Response, ProxyError> {
        let client_ip = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());
        let (parts, body) = request.into_parts();
        let url = self.upstream_url(&parts.uri);

        let mut headers = parts.headers;
        let inbound_host = headers
            .get(header::HOST)
            .cloned()
            .or_else(|| parts.uri.authority().and_then(|a| HeaderValue::from_str(a.as_str()).ok()));

        strip_hop_by_hop(&mut headers);
        headers.insert(header::HOST, self.target_host.clone());
        if let Some(host) = inbound_host {
            headers.insert(X_FORWARDED_HOST, host);
        }
        if let Some(ip) = client_ip {
            append_forwarded_for(&mut headers, &ip.to_string());
        }

        let response = self
            .http
            .request(parts.method, url)
            .headers(headers)
            .body(reqwest::Body::wrap_stream(body.into_data_stream()))
            .send()
            .await
            .map_err(|e| ProxyError::BackendUnreachable {
                details: e.to_string(),
            })?;

        let status = response.status();
        let mut response_headers = response.headers().clone();
        strip_hop_by_hop(&mut response_headers);

        let mut proxied = Response::new(Body::from_stream(response.bytes_stream()));
        *proxied.status_mut() = status;
        *proxied.headers_mut() = response_headers;
        Ok(proxied)
    }
}

/// Removes hop-by-hop headers, including any named by `Connection`.
fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in &named {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
}

fn append_forwarded_for(headers: &mut HeaderMap, client_ip: &str) {
    let value = match headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(existing) if !existing.trim().is_empty() => format!("{existing}, {client_ip}"),
        _ => client_ip.to_string(),
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}

/// Fallback handler forwarding every gated request to the backend.
pub async fn forward(State(state): State<AppState>, request: Request) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    match state.proxy.forward(request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(%method, %path, error = %e, "Failed to proxy request");
            pages::bad_gateway()
        }
    }
}
