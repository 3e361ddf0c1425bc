//! Scholarship application intake: validation, sanitization, duplicate-safe persistence, and
//! best-effort confirmation mail.
//!
//! Store and mail clients are injected as generic parameters so the workflow can
//! run against the production adapters or in-memory doubles.

pub mod dedupe;
pub mod domain;
pub mod mailer;
pub mod notifier;
pub mod repository;
pub mod router;
pub mod sanitize;
pub mod service;
pub mod validation;

#[cfg(test)]
mod tests;

pub use dedupe::Deduplicator;
pub use domain::{
    ApplicantId, ApplicantRecord, ApplicantStatus, ConfirmationEmail, Gender, InternetType,
    NewApplicant, NormalizedEmail, SubmissionStage, ValidatedSubmission,
};
pub use mailer::{ConfiguredMailer, LogMailer, SmtpMailer};
pub use notifier::Notifier;
pub use repository::{ApplicantStore, MailError, Mailer, StoreError};
pub use router::{intake_router, MAX_BODY_BYTES};
pub use sanitize::sanitize;
pub use service::{
    prepare, PreparedSubmission, RejectionKind, SubmissionError, SubmissionWorkflow,
};
pub use validation::{validate, ValidationErrorSet, FORM_FIELD};
