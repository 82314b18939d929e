use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use axum::body::Body;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};
use sqlx::types::Uuid;

use bragger_common::{verify_token, EnvVars};

use crate::env::ApiServerEnv;
use crate::response::AppError;
use crate::utils::extract_bearer_token;
use crate::GlobalState;

/// Authenticated user id, inserted by [`authenticate`].
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

/// Inserted by [`optional_auth`]. Never causes a rejection.
#[derive(Debug, Clone, Copy)]
pub struct MaybeUser(pub Option<Uuid>);

/// Bearer-token gate: missing/malformed header is 401, a token that fails
/// verification (bad signature, expired) is 403.
pub async fn authenticate(mut req: Request, next: Next) -> Result<Response<Body>, AppError> {
    let token = extract_bearer_token(&req)
        .map_err(|_| AppError::new(StatusCode::UNAUTHORIZED, anyhow!("Access token required")))?;

    let user_id = decode_user_id(&token).ok_or_else(|| {
        AppError::new(StatusCode::FORBIDDEN, anyhow!("Invalid or expired token"))
    })?;

    req.extensions_mut().insert(AuthUser(user_id));
    Ok(next.run(req).await)
}

pub async fn optional_auth(mut req: Request, next: Next) -> Result<Response<Body>, AppError> {
    let user_id = extract_bearer_token(&req)
        .ok()
        .and_then(|token| decode_user_id(&token));
    req.extensions_mut().insert(MaybeUser(user_id));
    Ok(next.run(req).await)
}

fn decode_user_id(token: &str) -> Option<Uuid> {
    let env = ApiServerEnv::load();
    let claims = verify_token(token, &env.jwt_secret).ok()?;
    Uuid::parse_str(&claims.user_id).ok()
}

const RATE_LIMIT_MAX_REQUESTS: u32 = 100;
const RATE_LIMIT_WINDOW_SECS: u64 = 15 * 60;

pub type IpRateLimiter = RateLimiter<IpAddr, DefaultKeyedStateStore<IpAddr>, DefaultClock>;

/// 100 requests per 15 minutes per client IP: the bucket holds the full
/// window's burst and refills one slot every window/max seconds.
pub fn ip_rate_limiter() -> Arc<IpRateLimiter> {
    let period = Duration::from_secs(RATE_LIMIT_WINDOW_SECS / RATE_LIMIT_MAX_REQUESTS as u64);
    let quota = Quota::with_period(period)
        .expect("rate limit period is non-zero")
        .allow_burst(NonZeroU32::new(RATE_LIMIT_MAX_REQUESTS).expect("burst is non-zero"));
    Arc::new(RateLimiter::keyed(quota))
}

pub async fn rate_limit(
    State(state): State<GlobalState>,
    req: Request,
    next: Next,
) -> Result<Response<Body>, AppError> {
    let ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    if state.rate_limiter.check_key(&ip).is_err() {
        return Err(AppError::new(
            StatusCode::TOO_MANY_REQUESTS,
            anyhow!("Too many requests, please try again later"),
        ));
    }
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limiter_allows_a_burst_then_throttles() {
        let limiter = ip_rate_limiter();
        let ip = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        for _ in 0..RATE_LIMIT_MAX_REQUESTS {
            assert!(limiter.check_key(&ip).is_ok());
        }
        assert!(limiter.check_key(&ip).is_err());

        // A different client has its own bucket.
        let other = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));
        assert!(limiter.check_key(&other).is_ok());
    }
}
