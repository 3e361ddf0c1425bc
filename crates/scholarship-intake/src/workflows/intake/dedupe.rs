use std::sync::Arc;

use tracing::debug;

use super::domain::NormalizedEmail;
use super::repository::{ApplicantStore, StoreError};

/// Looks up existing applicants by normalized email.
pub struct Deduplicator<S> {
    store: Arc<S>,
}

impl<S> Deduplicator<S>
where
    S: ApplicantStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Whether an applicant with this email is already persisted.
    ///
    /// Store failures are returned as errors so callers never mistake an outage for "not found".
    pub async fn exists(&self, email: &NormalizedEmail) -> Result<bool, StoreError> {
        let existing = self.store.find_by_email(email).await?;
        debug!(
            email_domain = email.domain(),
            found = existing.is_some(),
            "duplicate check complete"
        );
        Ok(existing.is_some())
    }
}
