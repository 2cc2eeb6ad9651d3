//! Best-effort notifications
//!
//! Notifications are sent after the mutation committed. Delivery failures are
//! logged and never reach the caller.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, Message},
    transport::smtp::authentication::Credentials,
    SmtpTransport, Transport,
};

use crate::{
    config::EmailConfig,
    error::{AppError, AppResult},
    models::{Asset, AssetStatus, Settings, User},
};

/// Outgoing notification channel
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, recipient: &str, subject: &str, fields: Vec<(String, String)>) -> AppResult<()>;
}

/// SMTP delivery. Sending happens on a blocking task that is not awaited.
#[derive(Clone)]
pub struct EmailNotifier {
    config: EmailConfig,
}

impl EmailNotifier {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn build_mailer(&self) -> AppResult<SmtpTransport> {
        let mailer_builder = if self.config.smtp_use_tls {
            SmtpTransport::starttls_relay(&self.config.smtp_host)
                .map_err(|e| AppError::Internal(format!("Failed to create SMTP transport: {}", e)))?
        } else {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
        }
        .port(self.config.smtp_port);

        let mailer_builder = if let (Some(username), Some(password)) =
            (&self.config.smtp_username, &self.config.smtp_password)
        {
            mailer_builder.credentials(Credentials::new(username.clone(), password.clone()))
        } else {
            mailer_builder
        };

        Ok(mailer_builder.build())
    }
}

fn render(fields: &[(String, String)]) -> String {
    fields
        .iter()
        .map(|(label, value)| format!("{}: {}", label, value))
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn notify(&self, recipient: &str, subject: &str, fields: Vec<(String, String)>) -> AppResult<()> {
        let from_name = self.config.smtp_from_name.as_deref().unwrap_or("AssetDesk");
        let from_mailbox = Mailbox::from_str(&format!("{} <{}>", from_name, self.config.smtp_from))
            .map_err(|e| AppError::Internal(format!("Invalid from address: {}", e)))?;
        let to_mailbox = Mailbox::from_str(recipient)
            .map_err(|e| AppError::Internal(format!("Invalid to address: {}", e)))?;

        let email = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(render(&fields))
            .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))?;

        let mailer = self.build_mailer()?;
        let recipient = recipient.to_string();

        tokio::task::spawn_blocking(move || {
            if let Err(e) = mailer.send(&email) {
                tracing::warn!(recipient = %recipient, error = %e, "Failed to send notification email");
            }
        });

        Ok(())
    }
}

/// Writes notifications to the log; used when SMTP is disabled
#[derive(Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, recipient: &str, subject: &str, fields: Vec<(String, String)>) -> AppResult<()> {
        tracing::info!(recipient, subject, body = %render(&fields), "Notification");
        Ok(())
    }
}

/// Pick the notifier matching the email configuration
pub fn notifier_from_config(config: &EmailConfig) -> Arc<dyn Notifier> {
    if config.enabled {
        Arc::new(EmailNotifier::new(config.clone()))
    } else {
        Arc::new(LogNotifier)
    }
}

/// Domain notifications on top of a `Notifier`
#[derive(Clone)]
pub struct NotificationService {
    notifier: Arc<dyn Notifier>,
}

impl NotificationService {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    async fn send(&self, recipient: &str, subject: &str, fields: Vec<(String, String)>) {
        if let Err(e) = self.notifier.notify(recipient, subject, fields).await {
            tracing::warn!(recipient, subject, error = %e, "Notification failed");
        }
    }

    pub async fn asset_assigned(&self, settings: &Settings, asset: &Asset, user: &User) {
        if !(settings.enable_notifications && settings.notify_on_assignment) {
            return;
        }
        let mut fields = vec![
            ("Asset".to_string(), asset.asset_code.clone()),
            ("Assigned to".to_string(), user.name.clone()),
        ];
        if asset.is_spare_assignment {
            let until = asset
                .spare_return_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "not set".to_string());
            fields.push(("Spare until".to_string(), until));
        }
        self.send(&user.email, &format!("Asset {} assigned to you", asset.asset_code), fields)
            .await;
    }

    /// Sent to the previous holder, or to the admin address when nobody held the asset
    pub async fn asset_status_changed(
        &self,
        settings: &Settings,
        asset: &Asset,
        from: AssetStatus,
        holder: Option<&User>,
    ) {
        if !(settings.enable_notifications && settings.notify_on_status_change) || from == asset.status {
            return;
        }
        let recipient = holder
            .map(|u| u.email.clone())
            .unwrap_or_else(|| settings.admin_email_for_notifications.clone());
        let fields = vec![
            ("Asset".to_string(), asset.asset_code.clone()),
            ("Previous status".to_string(), from.to_string()),
            ("New status".to_string(), asset.status.to_string()),
        ];
        self.send(&recipient, &format!("Asset {} is now {}", asset.asset_code, asset.status), fields)
            .await;
    }
}
