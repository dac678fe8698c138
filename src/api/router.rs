//! HTTP routing configuration with rate limiting and the error pipeline.
//!
//! Layer order, outermost first: tracing, CORS, panic capture, timeout and
//! load shedding, rate limiting, maintenance gate, authentication. CORS sits
//! outside panic capture so panic responses still carry CORS headers.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;

use axum::{
    BoxError, Router,
    body::Body,
    error_handling::HandleErrorLayer,
    extract::{ConnectInfo, DefaultBodyLimit, State},
    http::{HeaderValue, Request, Response},
    middleware::{self, Next},
    response::IntoResponse,
    routing::get,
};
use governor::{Quota, RateLimiter};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::app::{AppState, RateLimitConfig};
use crate::domain::AppError;

use super::handlers::{
    current_actor_handler, endpoint_not_found_handler, health_check_handler, liveness_handler,
    method_not_allowed_handler, metrics_handler, readiness_handler,
};
use super::middleware::{authenticate, maintenance_gate};
use super::security::{OriginPattern, cors_layer};

type KeyedLimiter = RateLimiter<
    IpAddr,
    governor::state::keyed::DashMapStateStore<IpAddr>,
    governor::clock::DefaultClock,
>;

/// Shared rate limiter state (keyed by client IP to prevent global DoS)
pub struct RateLimitState {
    limiter: KeyedLimiter,
    config: RateLimitConfig,
}

impl RateLimitState {
    pub fn new(config: RateLimitConfig) -> Self {
        let rps = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(config.burst).unwrap_or(NonZeroU32::MIN);

        Self {
            limiter: RateLimiter::dashmap(Quota::per_second(rps).allow_burst(burst)),
            config,
        }
    }
}

/// Extract client IP from request (X-Forwarded-For, X-Real-IP, or ConnectInfo).
/// Falls back to 0.0.0.0 when unknown; unknown clients share one bucket.
fn client_ip_from_request<B>(request: &Request<B>) -> IpAddr {
    // Prefer proxy headers (client is first in X-Forwarded-For)
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|first| first.trim().parse::<IpAddr>().ok());
    if let Some(ip) = forwarded {
        return ip;
    }

    let real_ip = request
        .headers()
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<IpAddr>().ok());
    if let Some(ip) = real_ip {
        return ip;
    }

    // Present when served through into_make_service_with_connect_info
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip();
    }
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

/// Per-IP rate limit middleware.
async fn rate_limit_middleware(
    State(rate_limit): State<Arc<RateLimitState>>,
    request: Request<Body>,
    next: Next,
) -> Response<Body> {
    let client_ip = client_ip_from_request(&request);
    let limit = HeaderValue::from(rate_limit.config.requests_per_second);

    let mut response = match rate_limit.limiter.check_key(&client_ip) {
        Ok(()) => next.run(request).await,
        Err(not_until) => {
            let wait_time = not_until.wait_time_from(governor::clock::Clock::now(
                &governor::clock::DefaultClock::default(),
            ));
            // Round up so clients never retry too early.
            let retry_after_secs = wait_time.as_secs() + u64::from(wait_time.subsec_nanos() > 0);

            let mut response = AppError::RateLimitExceeded { retry_after_secs }.into_response();
            response
                .headers_mut()
                .insert("X-RateLimit-Remaining", HeaderValue::from_static("0"));
            response
        }
    };

    response.headers_mut().insert("X-RateLimit-Limit", limit);
    response
}

/// Maps failures raised by tower middleware (timeout, load shedding).
async fn handle_middleware_error(err: BoxError) -> AppError {
    if err.is::<tower::timeout::error::Elapsed>() {
        AppError::Timeout("request exceeded the configured timeout".to_string())
    } else if err.is::<tower::load_shed::error::Overloaded>() {
        AppError::Overloaded
    } else {
        AppError::Other(anyhow::anyhow!(err))
    }
}

fn panic_response(panic: Box<dyn std::any::Any + Send + 'static>) -> Response<Body> {
    let detail = panic
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| panic.downcast_ref::<&str>().map(ToString::to_string))
        .unwrap_or_else(|| "handler panicked".to_string());
    AppError::Unexpected(detail).into_response()
}

/// Routes served by this crate itself.
fn base_routes() -> Router<Arc<AppState>> {
    let health_routes = Router::new()
        .route("/", get(health_check_handler))
        .route("/live", get(liveness_handler))
        .route("/ready", get(readiness_handler));

    Router::new()
        .route("/me", get(current_actor_handler))
        .route("/metrics", get(metrics_handler))
        .nest("/health", health_routes)
}

/// Wrap `app_routes` (plus the built-in health endpoints) in the full request
/// pipeline. Downstream crates mount their own endpoints through this.
pub fn build_router(
    app_routes: Router<Arc<AppState>>,
    app_state: Arc<AppState>,
    rate_limit: Option<RateLimitConfig>,
) -> Router {
    let policy = app_state.policy.clone();
    let origins: Vec<OriginPattern> = policy
        .allowed_origins
        .iter()
        .map(|origin| OriginPattern::new(origin.as_str()))
        .collect();

    let mut router = base_routes()
        .merge(app_routes)
        .fallback(endpoint_not_found_handler)
        .method_not_allowed_fallback(method_not_allowed_handler)
        .layer(DefaultBodyLimit::max(policy.body_limit_bytes))
        .layer(middleware::from_fn_with_state(Arc::clone(&app_state), authenticate))
        .layer(middleware::from_fn_with_state(Arc::clone(&app_state), maintenance_gate));

    if let Some(config) = rate_limit {
        let rate_limit_state = Arc::new(RateLimitState::new(config));
        router = router.layer(middleware::from_fn_with_state(
            rate_limit_state,
            rate_limit_middleware,
        ));
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .load_shed()
                .concurrency_limit(policy.max_concurrent_requests)
                .timeout(policy.request_timeout),
        )
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors_layer(&origins, policy.cors_max_age))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(app_state)
}

/// Create router without rate limiting
pub fn create_router(app_state: Arc<AppState>) -> Router {
    build_router(Router::new(), app_state, None)
}

/// Create router with rate limiting enabled
pub fn create_router_with_rate_limit(app_state: Arc<AppState>, config: RateLimitConfig) -> Router {
    build_router(Router::new(), app_state, Some(config))
}
