use async_trait::async_trait;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::models::{application::ApplicationStatus, employer::Employer, student::Student};
use crate::utils::config::MailConfig;

/// Upper bound for a single delivery attempt, relay round trip included.
pub const SEND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("mail transport unavailable: {0}")]
    Transport(String),
    #[error("mail relay rejected message with status {0}")]
    Rejected(u16),
}

/// Outbound mail delivery.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), NotificationError>;
}

/// Writes messages to the log instead of delivering them.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), NotificationError> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            "email (log transport): {}",
            message.text
        );
        Ok(())
    }
}

/// Posts messages as JSON to an HTTP mail relay.
#[derive(Debug, Clone)]
pub struct HttpMailer {
    client: reqwest::Client,
    relay_url: String,
}

impl HttpMailer {
    pub fn new(relay_url: impl Into<String>) -> Self {
        Self::with_timeout(relay_url, SEND_TIMEOUT)
    }

    pub fn with_timeout(relay_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("mail client falls back to defaults: {}", e);
                reqwest::Client::new()
            });
        Self {
            client,
            relay_url: relay_url.into(),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), NotificationError> {
        let response = self
            .client
            .post(&self.relay_url)
            .json(&message)
            .send()
            .await
            .map_err(|e| NotificationError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotificationError::Rejected(response.status().as_u16()));
        }
        Ok(())
    }
}

/// Keeps every message in memory; handy for local runs and tests.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose every delivery fails after being recorded as attempted.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), NotificationError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(message);
        }
        if self.fail {
            return Err(NotificationError::Transport("recording mailer set to fail".into()));
        }
        Ok(())
    }
}

pub fn mailer_from_config(config: &MailConfig) -> Arc<dyn Mailer> {
    match &config.relay_url {
        Some(url) => Arc::new(HttpMailer::new(url.clone())),
        None => Arc::new(LogMailer),
    }
}

/// Renders the portal's templated emails and hands them to the [`Mailer`].
#[derive(Clone)]
pub struct NotificationService {
    mailer: Arc<dyn Mailer>,
    from: String,
    in_flight: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl NotificationService {
    pub fn new(mailer: Arc<dyn Mailer>, from: impl Into<String>) -> Self {
        Self {
            mailer,
            from: from.into(),
            in_flight: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn application_confirmation(
        &self,
        student: &Student,
        role: &str,
        application_id: i64,
    ) -> EmailMessage {
        EmailMessage {
            from: self.from.clone(),
            to: student.email.clone(),
            subject: "Application Confirmation".to_string(),
            text: format!(
                "Dear {},\n\nYour application for the {} internship has been received.\nApplication ID: {}\n\nWe will keep you posted on any status changes.\n\nBest regards,\nThe Internship Portal Team.",
                student.name, role, application_id
            ),
        }
    }

    pub fn status_update(
        &self,
        student: &Student,
        role: &str,
        application_id: i64,
        status: ApplicationStatus,
    ) -> EmailMessage {
        EmailMessage {
            from: self.from.clone(),
            to: student.email.clone(),
            subject: "Application Status Update".to_string(),
            text: format!(
                "Dear {},\n\nThe status of your application #{} for the {} internship is now: {}.\n\nBest regards,\nThe Internship Portal Team.",
                student.name, application_id, role, status
            ),
        }
    }

    pub fn password_reset(&self, employer: &Employer, reset_url: &str) -> EmailMessage {
        EmailMessage {
            from: self.from.clone(),
            to: employer.email.clone(),
            subject: "Password Reset Request".to_string(),
            text: format!(
                "Dear {},\n\nWe received a request to reset your password. Click the link below to reset your password:\n\n{}\n\nIf you did not request this, please ignore this email or contact support if you have any concerns.\n\nThis link will expire in 1 hour.\n\nBest regards,\nThe Internship Portal Team.",
                employer.name, reset_url
            ),
        }
    }

    /// Delivery that must succeed for the caller's operation to count.
    pub async fn deliver(&self, message: EmailMessage) -> Result<(), NotificationError> {
        send_bounded(self.mailer.as_ref(), message).await
    }

    /// Best-effort delivery off the request path. The send runs on its own
    /// task; failures and timeouts are logged, never reported to the caller.
    pub fn dispatch(&self, message: EmailMessage) {
        let mailer = self.mailer.clone();
        let handle = tokio::spawn(async move {
            let to = message.to.clone();
            let subject = message.subject.clone();
            match send_bounded(mailer.as_ref(), message).await {
                Ok(()) => tracing::debug!(%to, %subject, "notification sent"),
                Err(e) => tracing::error!(%to, %subject, "failed to send notification: {}", e),
            }
        });

        if let Ok(mut in_flight) = self.in_flight.lock() {
            in_flight.retain(|task| !task.is_finished());
            in_flight.push(handle);
        }
    }

    /// Waits for every dispatched notification still in flight. Used on
    /// shutdown and by tests.
    pub async fn flush(&self) {
        let pending: Vec<_> = match self.in_flight.lock() {
            Ok(mut in_flight) => in_flight.drain(..).collect(),
            Err(_) => return,
        };

        for task in pending {
            if let Err(e) = task.await {
                tracing::error!("notification task aborted: {}", e);
            }
        }
    }
}

async fn send_bounded(
    mailer: &dyn Mailer,
    message: EmailMessage,
) -> Result<(), NotificationError> {
    match tokio::time::timeout(SEND_TIMEOUT, mailer.send(message)).await {
        Ok(result) => result,
        Err(_) => Err(NotificationError::Transport(format!(
            "no response within {}s",
            SEND_TIMEOUT.as_secs()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn student() -> Student {
        Student {
            id: 41120210123,
            email: "f20210123@hyderabad.bits-pilani.ac.in".into(),
            name: "Asha".into(),
            phone: None,
            address: None,
            institution_id: None,
            photo_url: None,
            documents: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn confirmation_mentions_role_and_application_id() {
        let service = NotificationService::new(Arc::new(LogMailer), "portal@x.io");
        let message = service.application_confirmation(&student(), "Backend Intern", 42);
        assert_eq!(message.to, "f20210123@hyderabad.bits-pilani.ac.in");
        assert_eq!(message.from, "portal@x.io");
        assert!(message.text.contains("Backend Intern"));
        assert!(message.text.contains("42"));
    }

    #[test]
    fn status_update_mentions_new_status() {
        let service = NotificationService::new(Arc::new(LogMailer), "portal@x.io");
        let message = service.status_update(
            &student(),
            "Backend Intern",
            42,
            ApplicationStatus::InterviewScheduled,
        );
        assert!(message.text.contains("Interview Scheduled"));
    }

    #[tokio::test]
    async fn dispatch_swallows_transport_failures() {
        let mailer = Arc::new(RecordingMailer::failing());
        let service = NotificationService::new(mailer.clone(), "portal@x.io");
        let message = service.application_confirmation(&student(), "Intern", 1);

        service.dispatch(message.clone());
        service.flush().await;
        assert_eq!(mailer.sent(), vec![message.clone()]);
        assert!(service.deliver(message).await.is_err());
    }

    #[tokio::test]
    async fn flush_waits_for_every_dispatched_message() {
        let mailer = Arc::new(RecordingMailer::new());
        let service = NotificationService::new(mailer.clone(), "portal@x.io");
        service.dispatch(service.application_confirmation(&student(), "Intern", 1));
        service.dispatch(service.application_confirmation(&student(), "Intern", 2));

        service.flush().await;
        assert_eq!(mailer.sent().len(), 2);
        service.flush().await;
        assert_eq!(mailer.sent().len(), 2);
    }

    #[tokio::test]
    async fn http_mailer_gives_up_on_a_silent_relay() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/send", listener.local_addr().unwrap());
        let mailer = HttpMailer::with_timeout(url, Duration::from_millis(200));
        let service = NotificationService::new(Arc::new(mailer), "portal@x.io");
        let message = service.application_confirmation(&student(), "Intern", 1);

        let outcome = tokio::time::timeout(Duration::from_secs(5), service.deliver(message))
            .await
            .expect("relay timeout should fire first");
        assert!(matches!(outcome, Err(NotificationError::Transport(_))));
        drop(listener);
    }
}
