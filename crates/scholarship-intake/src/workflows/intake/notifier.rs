use std::sync::Arc;

use tracing::{debug, warn};

use super::domain::{ConfirmationEmail, SubmissionStage};
use super::repository::Mailer;

/// Best-effort confirmation sender.
///
/// Each dispatch runs on a detached task. The caller never observes whether the send
/// succeeded, failed, or is still in flight.
pub struct Notifier<M> {
    mailer: Arc<M>,
}

impl<M> Notifier<M>
where
    M: Mailer + 'static,
{
    pub fn new(mailer: Arc<M>) -> Self {
        Self { mailer }
    }

    pub fn dispatch(&self, message: ConfirmationEmail) {
        let mailer = Arc::clone(&self.mailer);
        tokio::spawn(async move {
            match mailer.send(message).await {
                Ok(()) => debug!(stage = %SubmissionStage::Notified, "confirmation email sent"),
                Err(err) => warn!(
                    stage = %SubmissionStage::Notified,
                    error = %err,
                    "confirmation email failed; discarding"
                ),
            }
        });
    }
}
