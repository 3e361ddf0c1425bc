use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use chrono::Utc;
use serde_json::{json, Value};
use tokio::sync::{Barrier, Notify};

use crate::workflows::intake::domain::{
    ApplicantId, ApplicantRecord, ConfirmationEmail, NewApplicant, NormalizedEmail,
};
use crate::workflows::intake::repository::{ApplicantStore, MailError, Mailer, StoreError};
use crate::workflows::intake::{intake_router, SubmissionWorkflow};

pub(super) fn submission() -> Value {
    json!({
        "full_name": "Juan Dela Cruz",
        "email": "Juan.DelaCruz@Example.com",
        "university": "University of the Philippines",
        "motivation": "I want to build tools for my barangay.",
        "year_level": "3rd year",
        "location": "Quezon City",
        "device": "Laptop",
        "learning_hopes": "Backend development and databases.",
        "goal": "Ship a capstone project that people use.",
        "commitment_hours": 10,
        "internet_type": "wifi",
        "age": 21,
        "gender": "male",
        "facebook_link": "https://facebook.com/jdc",
        "social_share_link": "https://facebook.com/post/1"
    })
}

pub(super) fn submission_with(field: &str, value: Value) -> Value {
    let mut raw = submission();
    raw.as_object_mut()
        .expect("fixture is an object")
        .insert(field.to_string(), value);
    raw
}

pub(super) fn submission_without(field: &str) -> Value {
    let mut raw = submission();
    raw.as_object_mut()
        .expect("fixture is an object")
        .remove(field);
    raw
}

pub(super) fn build_workflow() -> (
    SubmissionWorkflow<MemoryStore, RecordingMailer>,
    Arc<MemoryStore>,
    Arc<RecordingMailer>,
) {
    let store = Arc::new(MemoryStore::default());
    let mailer = Arc::new(RecordingMailer::default());
    let workflow = SubmissionWorkflow::new(store.clone(), mailer.clone());
    (workflow, store, mailer)
}

pub(super) fn router_with_workflow<S, M>(workflow: SubmissionWorkflow<S, M>) -> axum::Router
where
    S: ApplicantStore + 'static,
    M: Mailer + 'static,
{
    intake_router(Arc::new(workflow))
}

/// Store with a case-insensitive unique index on email.
#[derive(Default)]
pub(super) struct MemoryStore {
    records: Mutex<HashMap<String, ApplicantRecord>>,
    insert_attempts: AtomicUsize,
    lookups: AtomicUsize,
}

impl MemoryStore {
    pub(super) fn records(&self) -> Vec<ApplicantRecord> {
        self.records
            .lock()
            .expect("store mutex poisoned")
            .values()
            .cloned()
            .collect()
    }

    pub(super) fn insert_attempts(&self) -> usize {
        self.insert_attempts.load(Ordering::SeqCst)
    }

    pub(super) fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ApplicantStore for MemoryStore {
    async fn find_by_email(
        &self,
        email: &NormalizedEmail,
    ) -> Result<Option<ApplicantId>, StoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard.get(email.as_str()).map(|record| record.id.clone()))
    }

    async fn insert(&self, applicant: NewApplicant) -> Result<ApplicantRecord, StoreError> {
        let attempt = self.insert_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let mut guard = self.records.lock().expect("store mutex poisoned");
        let key = applicant.email.as_str().to_lowercase();
        if guard.contains_key(&key) {
            return Err(StoreError::Duplicate);
        }
        let record = ApplicantRecord {
            id: ApplicantId(format!("applicant-{attempt:04}")),
            created_at: Utc::now(),
            applicant,
        };
        guard.insert(key, record.clone());
        Ok(record)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Holds every lookup until two are in flight, so both pass the duplicate check.
pub(super) struct RacingStore {
    pub(super) inner: MemoryStore,
    barrier: Barrier,
}

impl Default for RacingStore {
    fn default() -> Self {
        Self {
            inner: MemoryStore::default(),
            barrier: Barrier::new(2),
        }
    }
}

#[async_trait]
impl ApplicantStore for RacingStore {
    async fn find_by_email(
        &self,
        email: &NormalizedEmail,
    ) -> Result<Option<ApplicantId>, StoreError> {
        let found = self.inner.find_by_email(email).await?;
        self.barrier.wait().await;
        Ok(found)
    }

    async fn insert(&self, applicant: NewApplicant) -> Result<ApplicantRecord, StoreError> {
        self.inner.insert(applicant).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.inner.ping().await
    }
}

pub(super) struct UnavailableStore;

#[async_trait]
impl ApplicantStore for UnavailableStore {
    async fn find_by_email(
        &self,
        _email: &NormalizedEmail,
    ) -> Result<Option<ApplicantId>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    async fn insert(&self, _applicant: NewApplicant) -> Result<ApplicantRecord, StoreError> {
        panic!("insert must not run after a failed duplicate check");
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

/// Passes the duplicate check, then fails the insert with a fixed error.
pub(super) struct FailingInsertStore {
    error: StoreError,
}

impl FailingInsertStore {
    pub(super) fn new(error: StoreError) -> Self {
        Self { error }
    }
}

#[async_trait]
impl ApplicantStore for FailingInsertStore {
    async fn find_by_email(
        &self,
        _email: &NormalizedEmail,
    ) -> Result<Option<ApplicantId>, StoreError> {
        Ok(None)
    }

    async fn insert(&self, _applicant: NewApplicant) -> Result<ApplicantRecord, StoreError> {
        Err(self.error.clone())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct RecordingMailer {
    sent: Mutex<Vec<ConfirmationEmail>>,
    notify: Notify,
}

impl RecordingMailer {
    pub(super) fn sent(&self) -> Vec<ConfirmationEmail> {
        self.sent.lock().expect("mailer mutex poisoned").clone()
    }

    /// Wait until the detached notifier has delivered `expected` messages.
    pub(super) async fn wait_for_sends(&self, expected: usize) -> Vec<ConfirmationEmail> {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                let sent = self.sent();
                if sent.len() >= expected {
                    return sent;
                }
                self.notify.notified().await;
            }
        })
        .await
        .expect("confirmation dispatched in time")
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: ConfirmationEmail) -> Result<(), MailError> {
        self.sent.lock().expect("mailer mutex poisoned").push(message);
        self.notify.notify_one();
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct FailingMailer {
    attempts: AtomicUsize,
    notify: Notify,
}

impl FailingMailer {
    pub(super) async fn wait_for_attempt(&self) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while self.attempts.load(Ordering::SeqCst) == 0 {
                self.notify.notified().await;
            }
        })
        .await
        .expect("send attempted in time");
    }
}

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _message: ConfirmationEmail) -> Result<(), MailError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.notify.notify_one();
        Err(MailError::Transport("relay refused connection".to_string()))
    }
}

/// Transport that never completes.
pub(super) struct HangingMailer;

#[async_trait]
impl Mailer for HangingMailer {
    async fn send(&self, _message: ConfirmationEmail) -> Result<(), MailError> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
