use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::dedupe::Deduplicator;
use super::domain::{
    ApplicantRecord, ApplicantStatus, ConfirmationEmail, NewApplicant, NormalizedEmail,
    SubmissionStage, ValidatedSubmission,
};
use super::notifier::Notifier;
use super::repository::{ApplicantStore, Mailer, StoreError};
use super::sanitize::sanitize;
use super::validation::{is_valid_email, validate, ValidationErrorSet};

/// Orchestrates validate → sanitize → duplicate check → persist → notify.
///
/// Holds only shared handles to its collaborators, so one instance can serve any number of
/// concurrent submissions.
pub struct SubmissionWorkflow<S, M> {
    store: Arc<S>,
    deduplicator: Deduplicator<S>,
    notifier: Notifier<M>,
}

impl<S, M> SubmissionWorkflow<S, M>
where
    S: ApplicantStore + 'static,
    M: Mailer + 'static,
{
    pub fn new(store: Arc<S>, mailer: Arc<M>) -> Self {
        Self {
            deduplicator: Deduplicator::new(Arc::clone(&store)),
            notifier: Notifier::new(mailer),
            store,
        }
    }

    /// Run a raw submission through the intake pipeline.
    ///
    /// Returns once the outcome is known. The confirmation email for an accepted submission
    /// is dispatched on a detached task and never affects the returned result.
    pub async fn submit(&self, raw: &Value) -> Result<ApplicantRecord, SubmissionError> {
        debug!(stage = %SubmissionStage::Received, "submission received");
        let prepared = prepare(raw).map_err(|errors| {
            info!(
                stage = %SubmissionStage::Validated,
                fields = %errors,
                "submission rejected: invalid"
            );
            SubmissionError::Invalid(errors)
        })?;
        let PreparedSubmission {
            applicant,
            confirmation,
        } = prepared;
        let email_domain = applicant.email.domain().to_string();
        debug!(stage = %SubmissionStage::Validated, %email_domain, "submission validated");

        match self.deduplicator.exists(&applicant.email).await {
            Ok(false) => {
                debug!(
                    stage = %SubmissionStage::CheckedForDuplicate,
                    %email_domain,
                    "email not yet registered"
                );
            }
            Ok(true) => {
                info!(
                    stage = %SubmissionStage::CheckedForDuplicate,
                    %email_domain,
                    "submission rejected: duplicate"
                );
                return Err(SubmissionError::Duplicate);
            }
            Err(source) => {
                error!(
                    stage = %SubmissionStage::CheckedForDuplicate,
                    error = %source,
                    "duplicate check failed"
                );
                return Err(SubmissionError::Server {
                    stage: SubmissionStage::CheckedForDuplicate,
                    source,
                });
            }
        }

        let record = match self.store.insert(applicant).await {
            Ok(record) => record,
            Err(StoreError::Duplicate) => {
                warn!(
                    stage = %SubmissionStage::Persisted,
                    %email_domain,
                    "insert hit unique constraint after duplicate check passed"
                );
                return Err(SubmissionError::Duplicate);
            }
            Err(source) => {
                error!(
                    stage = %SubmissionStage::Persisted,
                    error = %source,
                    "applicant insert failed"
                );
                return Err(SubmissionError::Server {
                    stage: SubmissionStage::Persisted,
                    source,
                });
            }
        };

        info!(
            stage = %SubmissionStage::Persisted,
            applicant_id = %record.id,
            %email_domain,
            "submission accepted"
        );
        self.notifier.dispatch(confirmation);

        Ok(record)
    }

    /// Round trip to the store for health endpoints.
    pub async fn store_health(&self) -> Result<(), StoreError> {
        self.store.ping().await
    }
}

/// Applicant row and confirmation payload derived from a valid submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreparedSubmission {
    pub applicant: NewApplicant,
    pub confirmation: ConfirmationEmail,
}

/// Validate and normalize a raw submission without touching the store.
pub fn prepare(raw: &Value) -> Result<PreparedSubmission, ValidationErrorSet> {
    let validated = validate(raw)?;
    normalize(validated)
}

fn normalize(submission: ValidatedSubmission) -> Result<PreparedSubmission, ValidationErrorSet> {
    let mut errors = ValidationErrorSet::default();
    let mut clean = |field: &str, label: &str, value: &str| {
        let cleaned = sanitize(value);
        if cleaned.is_empty() {
            errors.insert(field, format!("{label} contains no usable characters."));
        }
        cleaned
    };

    let full_name = clean("full_name", "Full name", &submission.full_name);
    let email_key = clean("email", "Email", &submission.email);
    let university = clean("university", "University", &submission.university);
    let motivation = clean("motivation", "Motivation", &submission.motivation);
    let course_year = clean("year_level", "Year level", &submission.year_level);
    let learning_topic = clean("learning_hopes", "Learning hopes", &submission.learning_hopes);
    let goal = clean("goal", "Goal", &submission.goal);

    // Sanitizing drops symbols such as `+`, which can leave a non-address behind.
    if !email_key.is_empty() && !is_valid_email(&email_key) {
        errors.insert("email", "Please provide a valid email address.");
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    let applicant = NewApplicant {
        full_name: full_name.clone(),
        email: NormalizedEmail::parse(&email_key),
        university,
        motivation,
        status: ApplicantStatus::Pending,
        age: submission.age,
        gender: submission.gender,
        course_year,
        facebook_link: submission.facebook_link,
        learning_topic,
        connection_type: submission.internet_type,
        consent: true,
        goal,
    };

    Ok(PreparedSubmission {
        applicant,
        confirmation: ConfirmationEmail {
            to: submission.email,
            name: full_name,
        },
    })
}

/// Caller-facing rejection category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    Invalid,
    Duplicate,
    ServerError,
}

/// Error raised by the submission workflow.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("submission failed validation: {0}")]
    Invalid(ValidationErrorSet),
    #[error("email already registered")]
    Duplicate,
    #[error("store failure at stage {stage}: {source}")]
    Server {
        stage: SubmissionStage,
        #[source]
        source: StoreError,
    },
}

impl SubmissionError {
    pub fn kind(&self) -> RejectionKind {
        match self {
            SubmissionError::Invalid(_) => RejectionKind::Invalid,
            SubmissionError::Duplicate => RejectionKind::Duplicate,
            SubmissionError::Server { .. } => RejectionKind::ServerError,
        }
    }

    pub fn field_errors(&self) -> Option<&ValidationErrorSet> {
        match self {
            SubmissionError::Invalid(errors) => Some(errors),
            _ => None,
        }
    }
}
