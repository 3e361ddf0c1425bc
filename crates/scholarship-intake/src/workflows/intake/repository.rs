use async_trait::async_trait;

use super::domain::{ApplicantId, ApplicantRecord, ConfirmationEmail, NewApplicant, NormalizedEmail};

/// Persistence capability backing the intake workflow.
///
/// Implementations must enforce a case-insensitive unique constraint on email and report a
/// violation of it as [`StoreError::Duplicate`], never as a generic failure.
#[async_trait]
pub trait ApplicantStore: Send + Sync {
    async fn find_by_email(
        &self,
        email: &NormalizedEmail,
    ) -> Result<Option<ApplicantId>, StoreError>;

    async fn insert(&self, applicant: NewApplicant) -> Result<ApplicantRecord, StoreError>;

    /// Cheap round trip used by health checks.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("an applicant with this email already exists")]
    Duplicate,
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store rejected the request: {0}")]
    Rejected(String),
}

/// Outbound confirmation transport (SMTP relay, log sink, test double).
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: ConfirmationEmail) -> Result<(), MailError>;
}

/// Mail dispatch error. Never surfaced to submitters.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("invalid mail address: {0}")]
    Address(String),
    #[error("failed to build message: {0}")]
    Message(String),
    #[error("mail transport unavailable: {0}")]
    Transport(String),
}
