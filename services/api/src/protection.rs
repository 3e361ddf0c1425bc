use axum::error_handling::HandleErrorLayer;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::{BoxError, Json, Router};
use scholarship_intake::config::RateLimitConfig;
use serde_json::{json, Value};
use tower::buffer::BufferLayer;
use tower::limit::RateLimitLayer;
use tower::load_shed::error::Overloaded;
use tower::load_shed::LoadShedLayer;
use tower::ServiceBuilder;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{error, warn};

const LIMITER_QUEUE: usize = 1024;

/// Response headers applied to every reply, mirroring helmet's defaults with cross-origin
/// resource loading allowed for the separately hosted frontend.
const SECURITY_HEADERS: [(&str, &str); 12] = [
    (
        "content-security-policy",
        "default-src 'self';base-uri 'self';font-src 'self' https: data:;form-action 'self';\
         frame-ancestors 'self';img-src 'self' data:;object-src 'none';script-src 'self';\
         script-src-attr 'none';style-src 'self' https: 'unsafe-inline';upgrade-insecure-requests",
    ),
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-resource-policy", "cross-origin"),
    ("origin-agent-cluster", "?1"),
    ("referrer-policy", "no-referrer"),
    ("strict-transport-security", "max-age=31536000; includeSubDomains"),
    ("x-content-type-options", "nosniff"),
    ("x-dns-prefetch-control", "off"),
    ("x-download-options", "noopen"),
    ("x-frame-options", "SAMEORIGIN"),
    ("x-permitted-cross-domain-policies", "none"),
    ("x-xss-protection", "0"),
];

/// Put `router` behind one fixed-window request budget shared by all routes.
///
/// Requests beyond the budget are refused with 429 rather than queued until the window
/// resets.
pub(crate) fn rate_limited(router: Router, limit: RateLimitConfig) -> Router {
    let limited = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(limiter_error))
        .layer(BufferLayer::new(LIMITER_QUEUE))
        .layer(LoadShedLayer::new())
        .layer(RateLimitLayer::new(limit.max_requests, limit.window))
        .service(router);

    Router::new().fallback_service(limited)
}

pub(crate) fn with_security_headers(router: Router) -> Router {
    SECURITY_HEADERS
        .iter()
        .fold(router, |router, &(name, value)| {
            router.layer(SetResponseHeaderLayer::if_not_present(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            ))
        })
}

async fn limiter_error(err: BoxError) -> (StatusCode, Json<Value>) {
    if err.is::<Overloaded>() {
        warn!("request budget exhausted");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "ok": false, "error": "Too many requests, please try again later." })),
        );
    }

    error!(error = %err, "request limiter failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "ok": false, "error": "Server error" })),
    )
}
