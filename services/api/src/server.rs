use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryApplicantStore};
use crate::protection::{rate_limited, with_security_headers};
use crate::routes::with_intake_routes;
use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::{Extension, Router};
use axum_prometheus::PrometheusMetricLayer;
use chrono::Utc;
use scholarship_intake::config::{AppConfig, AppEnvironment, ServerConfig};
use scholarship_intake::error::AppError;
use scholarship_intake::telemetry;
use scholarship_intake::workflows::intake::{
    ApplicantStore, ConfiguredMailer, Mailer, SubmissionWorkflow,
};
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

const DEV_PORT_RETRIES: u16 = 5;
const CORS_MAX_AGE: Duration = Duration::from_secs(86_400);

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        started_at: Utc::now(),
    };

    let store = Arc::new(InMemoryApplicantStore::default());
    let mailer = ConfiguredMailer::from_config(&config.mail)?;
    info!(transport = mailer.transport_name(), "confirmation mailer configured");
    let workflow = Arc::new(SubmissionWorkflow::new(store, Arc::new(mailer)));

    let app = build_app(workflow, app_state, &config.server)
        .layer(TraceLayer::new_for_http())
        .layer(prometheus_layer);

    let retries = match config.environment {
        AppEnvironment::Development => DEV_PORT_RETRIES,
        AppEnvironment::Test | AppEnvironment::Production => 0,
    };
    let listener = bind_listener(config.server.socket_addr()?, retries).await?;
    let addr = listener.local_addr()?;
    readiness_flag.store(true, Ordering::Release);

    info!(environment = ?config.environment, %addr, "scholarship intake service ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("scholarship intake service stopped");
    Ok(())
}

/// Intake and service routes behind the request budget, CORS, and security headers.
fn build_app<S, M>(
    workflow: Arc<SubmissionWorkflow<S, M>>,
    state: AppState,
    server: &ServerConfig,
) -> Router
where
    S: ApplicantStore + 'static,
    M: Mailer + 'static,
{
    let app = rate_limited(with_intake_routes(workflow), server.rate_limit)
        .layer(Extension(state))
        .layer(cors_layer(&server.allowed_origins));
    with_security_headers(app)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-client")])
        .max_age(CORS_MAX_AGE)
}

/// Bind `addr`, walking up to `retries` following ports while the port is taken.
async fn bind_listener(addr: SocketAddr, retries: u16) -> Result<TcpListener, AppError> {
    let mut candidate = addr;
    let mut remaining = retries;
    loop {
        match TcpListener::bind(candidate).await {
            Ok(listener) => return Ok(listener),
            Err(err) if err.kind() == io::ErrorKind::AddrInUse && remaining > 0 => {
                let Some(next_port) = candidate.port().checked_add(1) else {
                    return Err(err.into());
                };
                warn!(port = candidate.port(), next_port, "port in use, trying next");
                candidate.set_port(next_port);
                remaining -= 1;
            }
            Err(err) => return Err(err.into()),
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
