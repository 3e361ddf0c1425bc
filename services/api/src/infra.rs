use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use scholarship_intake::workflows::intake::{
    ApplicantId, ApplicantRecord, ApplicantStore, NewApplicant, NormalizedEmail, StoreError,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) started_at: DateTime<Utc>,
}

/// Process-local applicant table keyed by lowercased email.
#[derive(Default, Clone)]
pub(crate) struct InMemoryApplicantStore {
    records: Arc<Mutex<HashMap<String, ApplicantRecord>>>,
    sequence: Arc<AtomicU64>,
}

impl InMemoryApplicantStore {
    fn next_id(&self) -> ApplicantId {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        ApplicantId(format!("app-{id:06}"))
    }

    fn poisoned() -> StoreError {
        StoreError::Unavailable("applicant table lock poisoned".to_string())
    }
}

#[async_trait]
impl ApplicantStore for InMemoryApplicantStore {
    async fn find_by_email(
        &self,
        email: &NormalizedEmail,
    ) -> Result<Option<ApplicantId>, StoreError> {
        let guard = self.records.lock().map_err(|_| Self::poisoned())?;
        Ok(guard
            .get(&email.as_str().to_lowercase())
            .map(|record| record.id.clone()))
    }

    async fn insert(&self, applicant: NewApplicant) -> Result<ApplicantRecord, StoreError> {
        let mut guard = self.records.lock().map_err(|_| Self::poisoned())?;
        let key = applicant.email.as_str().to_lowercase();
        if guard.contains_key(&key) {
            return Err(StoreError::Duplicate);
        }
        let record = ApplicantRecord {
            id: self.next_id(),
            created_at: Utc::now(),
            applicant,
        };
        guard.insert(key, record.clone());
        Ok(record)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.records.lock().map(|_| ()).map_err(|_| Self::poisoned())
    }
}
