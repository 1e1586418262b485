//! Rate limiting with governor and `tower_governor`.
//!
//! - `auth_rate_limiter`: login and registration (~10/min per IP)
//! - `webhook_rate_limiter`: payment notifications (~60/min per IP)

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

/// Client IP as reported by the proxy in front of the app.
///
/// Checks `Fly-Client-IP`, then the first `X-Forwarded-For` hop, then
/// `X-Real-IP`.
#[must_use]
pub fn client_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let parse = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
    };

    parse("fly-client-ip")
        .or_else(|| parse("x-forwarded-for"))
        .or_else(|| parse("x-real-ip"))
}

/// Keys requests by [`client_ip`], then by the socket peer.
///
/// Requests with neither (local runs without a proxy) share one bucket.
#[derive(Clone, Copy)]
pub struct ProxyIpKeyExtractor;

impl tower_governor::key_extractor::KeyExtractor for ProxyIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        Ok(client_ip(req.headers())
            .or_else(|| {
                req.extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|info| info.0.ip())
            })
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED)))
    }
}

pub type RateLimiterLayer =
    GovernorLayer<ProxyIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// 1 request every 6 seconds, burst of 5.
///
/// # Panics
///
/// Never in practice: both settings are non-zero constants.
#[must_use]
pub fn auth_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ProxyIpKeyExtractor)
        .per_second(6)
        .burst_size(5)
        .finish()
        .expect("auth rate limiter settings are non-zero");
    GovernorLayer::new(Arc::new(config))
}

/// 1 request per second, burst of 30. The gateway retries aggressively.
///
/// # Panics
///
/// Never in practice: both settings are non-zero constants.
#[must_use]
pub fn webhook_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ProxyIpKeyExtractor)
        .per_second(1)
        .burst_size(30)
        .finish()
        .expect("webhook rate limiter settings are non-zero");
    GovernorLayer::new(Arc::new(config))
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_client_ip_prefers_fly_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("10.0.0.1, 10.0.0.2"));
        assert_eq!(client_ip(&headers), "10.0.0.1".parse().ok());

        headers.insert("fly-client-ip", HeaderValue::from_static("203.0.113.9"));
        assert_eq!(client_ip(&headers), "203.0.113.9".parse().ok());
    }

    #[test]
    fn test_client_ip_missing() {
        let mut headers = HeaderMap::new();
        assert_eq!(client_ip(&headers), None);
        headers.insert("x-real-ip", HeaderValue::from_static("not-an-ip"));
        assert_eq!(client_ip(&headers), None);
    }
}
