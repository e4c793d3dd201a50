//! Per-client request rate limiting
//!
//! Keyed by peer IP address (from `ConnectInfo`). Requests without connection
//! info, such as in-process test calls, share the unspecified address.

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use governor::clock::{Clock, DefaultClock};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::warn;

use crate::error::ApiError;
use crate::AppState;

/// Rate limiter keyed by client address
pub type ClientRateLimiter = DefaultKeyedRateLimiter<IpAddr>;

/// Build a limiter allowing `requests_per_minute` per client; 0 disables limiting
pub fn build_limiter(requests_per_minute: u32) -> Option<Arc<ClientRateLimiter>> {
    let per_minute = NonZeroU32::new(requests_per_minute)?;
    Some(Arc::new(RateLimiter::keyed(Quota::per_minute(per_minute))))
}

fn client_ip(request: &Request) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

/// Reject requests over the client's quota with 429
pub async fn limit_per_client(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(limiter) = &state.rate_limiter {
        let client = client_ip(&request);
        if let Err(not_until) = limiter.check_key(&client) {
            let wait = not_until.wait_time_from(DefaultClock::default().now());
            // round up so clients never retry too early
            let retry_after_secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
            warn!(client = %client, retry_after_secs, "Rate limit exceeded");
            return Err(ApiError::RateLimited {
                retry_after_secs: retry_after_secs.max(1),
            });
        }
    }

    Ok(next.run(request).await)
}
