//! End-to-end scenarios for the scholarship intake workflow, driven through the public
//! workflow facade and HTTP router only.

mod common {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::{json, Value};
    use tokio::sync::Notify;

    use scholarship_intake::workflows::intake::{
        ApplicantId, ApplicantRecord, ApplicantStore, ConfirmationEmail, MailError, Mailer,
        NewApplicant, NormalizedEmail, StoreError,
    };

    pub fn submission(email: &str) -> Value {
        json!({
            "full_name": "Maria Santos",
            "email": email,
            "university": "Ateneo de Davao University",
            "motivation": "I want to mentor first-year students in programming.",
            "year_level": "2nd year",
            "device": "Android phone",
            "learning_hopes": "Web development fundamentals.",
            "goal": "Build a portfolio website by the end of the program.",
            "commitment_hours": "8",
            "internet_type": "mobile_data",
            "age": "19",
            "facebook_link": "https://facebook.com/jdc",
            "social_share_link": "https://facebook.com/post/1"
        })
    }

    /// Mirrors a database with a case-insensitive unique index on email.
    #[derive(Default)]
    pub struct TableStore {
        rows: Mutex<HashMap<String, ApplicantRecord>>,
        inserts: AtomicUsize,
    }

    impl TableStore {
        pub fn rows(&self) -> Vec<ApplicantRecord> {
            self.rows.lock().expect("rows mutex").values().cloned().collect()
        }

        pub fn inserts(&self) -> usize {
            self.inserts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ApplicantStore for TableStore {
        async fn find_by_email(
            &self,
            email: &NormalizedEmail,
        ) -> Result<Option<ApplicantId>, StoreError> {
            let rows = self.rows.lock().expect("rows mutex");
            Ok(rows.get(email.as_str()).map(|row| row.id.clone()))
        }

        async fn insert(&self, applicant: NewApplicant) -> Result<ApplicantRecord, StoreError> {
            let n = self.inserts.fetch_add(1, Ordering::SeqCst) + 1;
            let mut rows = self.rows.lock().expect("rows mutex");
            let key = applicant.email.as_str().to_lowercase();
            if rows.contains_key(&key) {
                return Err(StoreError::Duplicate);
            }
            let row = ApplicantRecord {
                id: ApplicantId(n.to_string()),
                created_at: Utc::now(),
                applicant,
            };
            rows.insert(key, row.clone());
            Ok(row)
        }

        async fn ping(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct Outbox {
        messages: Mutex<Vec<ConfirmationEmail>>,
        notify: Notify,
    }

    impl Outbox {
        pub async fn drain_after(&self, expected: usize) -> Vec<ConfirmationEmail> {
            tokio::time::timeout(Duration::from_secs(2), async {
                loop {
                    {
                        let messages = self.messages.lock().expect("outbox mutex");
                        if messages.len() >= expected {
                            return messages.clone();
                        }
                    }
                    self.notify.notified().await;
                }
            })
            .await
            .expect("outbox filled in time")
        }
    }

    #[async_trait]
    impl Mailer for Outbox {
        async fn send(&self, message: ConfirmationEmail) -> Result<(), MailError> {
            self.messages.lock().expect("outbox mutex").push(message);
            self.notify.notify_one();
            Ok(())
        }
    }
}

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use tower::ServiceExt;

use common::{submission, Outbox, TableStore};
use scholarship_intake::workflows::intake::{
    intake_router, prepare, ApplicantStatus, InternetType, LogMailer, RejectionKind,
    SubmissionWorkflow,
};

#[tokio::test]
async fn accepted_applicant_is_stored_with_normalized_email_and_confirmed() {
    let store = Arc::new(TableStore::default());
    let outbox = Arc::new(Outbox::default());
    let workflow = SubmissionWorkflow::new(store.clone(), outbox.clone());

    let record = workflow
        .submit(&submission("Maria.Santos@Example.org"))
        .await
        .expect("accepted");

    assert_eq!(store.inserts(), 1);
    assert_eq!(store.rows(), vec![record.clone()]);
    assert_eq!(record.email().as_str(), "maria.santos@example.org");
    assert_eq!(record.applicant.status, ApplicantStatus::Pending);
    assert!(record.applicant.consent);
    assert_eq!(record.applicant.age, 19);
    assert_eq!(record.applicant.connection_type, InternetType::MobileData);
    assert_eq!(record.applicant.gender, None);

    let sent = outbox.drain_after(1).await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "Maria.Santos@Example.org");
    assert_eq!(sent[0].name, "Maria Santos");
}

#[tokio::test]
async fn resubmitting_with_different_case_is_a_duplicate() {
    let store = Arc::new(TableStore::default());
    let workflow = SubmissionWorkflow::new(store.clone(), Arc::new(LogMailer));

    workflow
        .submit(&submission("A@x.com"))
        .await
        .expect("first accepted");
    let err = workflow
        .submit(&submission("a@x.com"))
        .await
        .expect_err("second rejected");

    assert_eq!(err.kind(), RejectionKind::Duplicate);
    assert_eq!(store.rows().len(), 1);
}

#[tokio::test]
async fn router_serves_intake_over_http() {
    let store = Arc::new(TableStore::default());
    let workflow = Arc::new(SubmissionWorkflow::new(store.clone(), Arc::new(LogMailer)));
    let router = intake_router(workflow);

    let body = serde_json::to_vec(&submission("maria@example.org")).expect("serializes");
    let response = router
        .oneshot(
            Request::post("/api/apply")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(store.rows().len(), 1);
}

#[test]
fn prepare_normalizes_without_a_store() {
    let prepared = prepare(&submission("  Maria@Example.ORG ")).expect("valid");
    assert_eq!(prepared.applicant.email.as_str(), "maria@example.org");
    assert_eq!(prepared.confirmation.to, "Maria@Example.ORG");
    assert_eq!(prepared.applicant.course_year, "2nd year");
}
