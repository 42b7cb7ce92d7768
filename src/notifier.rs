//! Guardian notification delivery.
//!
//! The evaluator talks to the `Notifier` trait; delivery is best-effort and
//! synchronous from its perspective. `SmtpNotifier` is the production
//! implementation (lettre), `RecordingNotifier` captures messages for tests,
//! and `DisabledNotifier` stands in when no SMTP settings are configured.

use std::sync::RwLock;

use chrono::NaiveTime;
use thiserror::Error;

use crate::config::SmtpConfig;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Invalid address: {0}")]
    Address(String),

    #[error("Failed to build message: {0}")]
    Message(String),

    #[error("SMTP delivery failed: {0}")]
    Delivery(String),

    #[error("Notifier is not configured")]
    NotConfigured,
}

/// A missed-dose alert addressed to the guardian.
#[derive(Debug, Clone)]
pub struct MissedDoseAlert {
    pub guardian_email: String,
    pub owner_name: String,
    pub medication_name: String,
    pub alarm_time: NaiveTime,
}

impl MissedDoseAlert {
    pub fn subject(&self) -> String {
        format!("[Dosekeeper] Missed dose alert for {}", self.owner_name)
    }

    pub fn body(&self) -> String {
        format!(
            "{owner} has not yet taken the medication '{med}'\n\
             that was scheduled for {time}.\n\
             Please check in with them.\n\n\
             - Dosekeeper",
            owner = self.owner_name,
            med = self.medication_name,
            time = self.alarm_time.format("%H:%M"),
        )
    }
}

/// Delivery seam used by the evaluator.
pub trait Notifier: Send + Sync {
    fn send(&self, alert: &MissedDoseAlert) -> Result<(), NotifyError>;
}

/// SMTP delivery via lettre.
pub struct SmtpNotifier {
    config: SmtpConfig,
}

impl SmtpNotifier {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }
}

impl Notifier for SmtpNotifier {
    fn send(&self, alert: &MissedDoseAlert) -> Result<(), NotifyError> {
        use lettre::message::header::ContentType;
        use lettre::transport::smtp::authentication::Credentials;
        use lettre::{Message, SmtpTransport, Transport};

        let email = Message::builder()
            .from(
                format!("{} <{}>", self.config.from_name, self.config.from_email)
                    .parse()
                    .map_err(|e| NotifyError::Address(format!("from: {e}")))?,
            )
            .to(alert
                .guardian_email
                .parse()
                .map_err(|e| NotifyError::Address(format!("to: {e}")))?)
            .subject(alert.subject())
            .header(ContentType::TEXT_PLAIN)
            .body(alert.body())
            .map_err(|e| NotifyError::Message(e.to_string()))?;

        let mailer = if self.config.username.is_empty() {
            // No authentication (local development SMTP servers)
            SmtpTransport::builder_dangerous(&self.config.host)
                .port(self.config.port)
                .build()
        } else {
            let creds = Credentials::new(self.config.username.clone(), self.config.password.clone());
            SmtpTransport::relay(&self.config.host)
                .map_err(|e| NotifyError::Delivery(e.to_string()))?
                .credentials(creds)
                .port(self.config.port)
                .build()
        };

        mailer
            .send(&email)
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;

        tracing::info!(
            to = %alert.guardian_email,
            medication = %alert.medication_name,
            "Missed-dose alert delivered"
        );
        Ok(())
    }
}

/// Fallback when SMTP is not configured: every send is an error the
/// evaluator records per medication without aborting its run.
pub struct DisabledNotifier;

impl Notifier for DisabledNotifier {
    fn send(&self, _alert: &MissedDoseAlert) -> Result<(), NotifyError> {
        Err(NotifyError::NotConfigured)
    }
}

/// Test notifier that records every alert instead of delivering it.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: RwLock<Vec<MissedDoseAlert>>,
    /// Medication names whose delivery should fail (for failure-isolation tests).
    pub fail_for: Vec<String>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(names: &[&str]) -> Self {
        Self {
            sent: RwLock::new(Vec::new()),
            fail_for: names.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn sent_count(&self) -> usize {
        self.sent.read().unwrap().len()
    }
}

impl Notifier for RecordingNotifier {
    fn send(&self, alert: &MissedDoseAlert) -> Result<(), NotifyError> {
        if self.fail_for.contains(&alert.medication_name) {
            return Err(NotifyError::Delivery("simulated failure".into()));
        }
        self.sent.write().unwrap().push(alert.clone());
        Ok(())
    }
}
