use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::warn;

use super::repository::{ApplicantStore, Mailer};
use super::service::{SubmissionError, SubmissionWorkflow};
use super::validation::ValidationErrorSet;

/// Largest accepted submission body.
pub const MAX_BODY_BYTES: usize = 10 * 1024;

/// Router builder exposing the application intake endpoints.
pub fn intake_router<S, M>(workflow: Arc<SubmissionWorkflow<S, M>>) -> Router
where
    S: ApplicantStore + 'static,
    M: Mailer + 'static,
{
    Router::new()
        .route("/apply", post(apply_handler::<S, M>))
        .route("/api/apply", post(apply_handler::<S, M>))
        .route("/health/store", get(store_health_handler::<S, M>))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(workflow)
}

pub(crate) async fn apply_handler<S, M>(
    State(workflow): State<Arc<SubmissionWorkflow<S, M>>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response
where
    S: ApplicantStore + 'static,
    M: Mailer + 'static,
{
    let Json(raw) = match payload {
        Ok(payload) => payload,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            let payload = json!({ "ok": false, "error": "Submission is too large." });
            return (StatusCode::PAYLOAD_TOO_LARGE, Json(payload)).into_response();
        }
        Err(rejection) => {
            warn!(error = %rejection, "unreadable submission body");
            return validation_failed(&ValidationErrorSet::form(
                "Request body must be a valid JSON object.",
            ));
        }
    };

    match workflow.submit(&raw).await {
        Ok(_) => (StatusCode::CREATED, Json(json!({ "ok": true }))).into_response(),
        Err(SubmissionError::Invalid(errors)) => validation_failed(&errors),
        Err(SubmissionError::Duplicate) => {
            let payload = json!({ "ok": false, "error": "Email already registered." });
            (StatusCode::CONFLICT, Json(payload)).into_response()
        }
        Err(SubmissionError::Server { .. }) => {
            let payload = json!({ "ok": false, "error": "Server error" });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}

fn validation_failed(errors: &ValidationErrorSet) -> Response {
    let payload = json!({
        "ok": false,
        "error": "Validation failed.",
        "errors": errors.messages(),
        "fieldErrors": errors,
    });
    (StatusCode::BAD_REQUEST, Json(payload)).into_response()
}

pub(crate) async fn store_health_handler<S, M>(
    State(workflow): State<Arc<SubmissionWorkflow<S, M>>>,
) -> Response
where
    S: ApplicantStore + 'static,
    M: Mailer + 'static,
{
    match workflow.store_health().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "ok": true }))).into_response(),
        Err(err) => {
            warn!(error = %err, "store health check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "ok": false })),
            )
                .into_response()
        }
    }
}
