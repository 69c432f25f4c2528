//! Client address and scheme, optionally rewritten from proxy headers.
//!
//! `X-Forwarded-For` / `X-Forwarded-Proto` are honoured only when the connecting peer is one of
//! the configured known proxies. With no known proxies (the default) they are ignored.

use crate::core::config::ForwardedHeadersSettings;
use crate::server::state::AppState;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use std::net::{IpAddr, SocketAddr};
use tracing::debug;

pub const FORWARDED_FOR: &str = "x-forwarded-for";
pub const FORWARDED_PROTO: &str = "x-forwarded-proto";

/// The effective client of a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip: Option<IpAddr>,
    pub scheme: String,
}

impl ClientInfo {
    pub fn is_https(&self) -> bool {
        self.scheme.eq_ignore_ascii_case("https")
    }
}

fn header_values(headers: &HeaderMap, name: &str) -> Vec<String> {
    headers
        .get_all(name)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}

/// Resolve the client, walking proxy headers right to left while each hop is trusted
pub fn resolve_client(
    settings: &ForwardedHeadersSettings,
    peer: Option<IpAddr>,
    scheme: &str,
    headers: &HeaderMap,
) -> ClientInfo {
    let mut client = ClientInfo {
        ip: peer,
        scheme: scheme.to_string(),
    };

    let Some(peer) = peer else {
        return client;
    };
    if !settings.known_proxies.contains(&peer) {
        return client;
    }

    let forwarded_for = header_values(headers, FORWARDED_FOR);
    let forwarded_proto = header_values(headers, FORWARDED_PROTO);

    for (hop, address) in forwarded_for
        .iter()
        .rev()
        .take(settings.forward_limit)
        .enumerate()
    {
        let Ok(ip) = address.parse::<IpAddr>() else {
            break;
        };
        client.ip = Some(ip);
        if let Some(proto) = forwarded_proto.iter().rev().nth(hop) {
            client.scheme = proto.to_ascii_lowercase();
        }
        if !settings.known_proxies.contains(&ip) {
            break;
        }
    }

    // Proto without For still counts from a trusted proxy
    if forwarded_for.is_empty() {
        if let Some(proto) = forwarded_proto.last() {
            client.scheme = proto.to_ascii_lowercase();
        }
    }

    client
}

pub async fn forwarded_headers(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(address)| address.ip());
    let scheme = request.uri().scheme_str().unwrap_or("http").to_string();

    let client = resolve_client(
        &state.config.forwarded_headers,
        peer,
        &scheme,
        request.headers(),
    );
    if client.ip != peer || client.scheme != scheme {
        debug!(client_ip = ?client.ip, scheme = %client.scheme, "Applied forwarded headers");
    }

    request.extensions_mut().insert(client);
    next.run(request).await
}
