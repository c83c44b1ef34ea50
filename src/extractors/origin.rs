//! Extract who is asking (client IP and user agent) for the validation log.

use crate::model::RequestOrigin;
use async_trait::async_trait;
use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{header::USER_AGENT, request::Parts},
};
use std::net::SocketAddr;

/// Set by proxies; the first entry is the original client.
pub const FORWARDED_FOR_HEADER: &str = "X-Forwarded-For";

pub const UNKNOWN_IP: &str = "unknown";
pub const UNKNOWN_USER_AGENT: &str = "Unknown";

/// Client address from `X-Forwarded-For`, else the socket peer, else `unknown`.
/// User agent defaults to `Unknown`.
#[derive(Clone, Debug)]
pub struct Origin(pub RequestOrigin);

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for Origin
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = header(parts, FORWARDED_FOR_HEADER)
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from);
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());
        let ip_address = forwarded.or(peer).unwrap_or_else(|| UNKNOWN_IP.to_string());
        let user_agent = header(parts, USER_AGENT.as_str())
            .unwrap_or(UNKNOWN_USER_AGENT)
            .to_string();
        Ok(Origin(RequestOrigin { ip_address, user_agent }))
    }
}
