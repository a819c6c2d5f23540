//! Email delivery activity.
//!
//! Mails are rendered from Handlebars templates bundled with the binary and
//! handed to a [`MailTransport`]. Two transports exist: an HTTP relay that
//! receives the rendered message as JSON, and a logging transport used when
//! no relay is configured.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use durable_kuflow::activities::{Activity, ActivityContext, ActivityResult};
use handlebars::Handlebars;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Activity name.
pub const SEND_MAIL: &str = "Email_sendMail";

/// Name of the bundled template.
pub const EMAIL_TEMPLATE: &str = "email";

const EMAIL_TEMPLATE_SOURCE: &str = include_str!("../../templates/email.hbs");

/// A mail to send: template name, recipient and template variables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Email {
    pub template: String,
    pub to: String,
    #[serde(default)]
    pub variables: HashMap<String, String>,
}

impl Email {
    #[must_use]
    pub fn new(template: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            to: to.into(),
            variables: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }
}

/// Input of [`SEND_MAIL`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMailRequest {
    pub email: Email,
}

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Why a mail could not be sent.
#[derive(Error, Debug)]
pub enum EmailError {
    #[error("Unknown email template '{0}'")]
    UnknownTemplate(String),

    #[error("Invalid recipient '{0}'")]
    InvalidRecipient(String),

    #[error("Failed to render email template: {0}")]
    Render(#[from] handlebars::RenderError),

    #[error("Mail relay rejected the message ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Mail relay unavailable: {0}")]
    Unavailable(String),
}

impl EmailError {
    /// Only relay outages may succeed on a later attempt.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<reqwest::Error> for EmailError {
    fn from(err: reqwest::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// Renders mail bodies from the bundled templates.
pub struct EmailRenderer {
    handlebars: Handlebars<'static>,
}

impl std::fmt::Debug for EmailRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailRenderer")
            .field("templates", &self.handlebars.get_templates().keys().collect::<Vec<_>>())
            .finish()
    }
}

impl EmailRenderer {
    /// Renderer with the bundled `email` template registered.
    pub fn new() -> Result<Self, handlebars::TemplateError> {
        let mut handlebars = Handlebars::new();
        handlebars.register_template_string(EMAIL_TEMPLATE, EMAIL_TEMPLATE_SOURCE)?;
        Ok(Self { handlebars })
    }

    /// Render `email` into a message sent from `from`.
    ///
    /// The `subject` variable becomes the subject line; every variable is
    /// available to the template, HTML-escaped.
    pub fn render(&self, from: &str, email: &Email) -> Result<OutgoingMail, EmailError> {
        if !self.handlebars.has_template(&email.template) {
            return Err(EmailError::UnknownTemplate(email.template.clone()));
        }
        let to = email.to.trim();
        if !to.contains('@') {
            return Err(EmailError::InvalidRecipient(email.to.clone()));
        }

        let html = self.handlebars.render(&email.template, &email.variables)?;
        Ok(OutgoingMail {
            from: from.to_string(),
            to: to.to_string(),
            subject: email.variables.get("subject").cloned().unwrap_or_default(),
            html,
        })
    }
}

/// Delivers rendered mail.
#[async_trait]
pub trait MailTransport: Send + Sync + std::fmt::Debug {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), EmailError>;
}

/// Posts each message as JSON to a relay URL.
#[derive(Debug, Clone)]
pub struct HttpRelayTransport {
    http: reqwest::Client,
    url: String,
}

impl HttpRelayTransport {
    pub fn new(url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }
}

#[async_trait]
impl MailTransport for HttpRelayTransport {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), EmailError> {
        let response = self.http.post(&self.url).json(mail).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let message = response.text().await.unwrap_or_default();
        if status.is_client_error() {
            Err(EmailError::Rejected {
                status: status.as_u16(),
                message,
            })
        } else {
            Err(EmailError::Unavailable(format!("{status}: {message}")))
        }
    }
}

/// Writes messages to the log instead of sending them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTransport;

#[async_trait]
impl MailTransport for LogTransport {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), EmailError> {
        tracing::info!(
            from = %mail.from,
            to = %mail.to,
            subject = %mail.subject,
            bytes = mail.html.len(),
            "Email delivered to log transport"
        );
        Ok(())
    }
}

/// `Email_sendMail` activity.
#[derive(Debug, Clone)]
pub struct EmailActivity {
    from: String,
    renderer: Arc<EmailRenderer>,
    transport: Arc<dyn MailTransport>,
}

impl EmailActivity {
    #[must_use]
    pub fn new(
        from: impl Into<String>,
        renderer: Arc<EmailRenderer>,
        transport: Arc<dyn MailTransport>,
    ) -> Self {
        Self {
            from: from.into(),
            renderer,
            transport,
        }
    }

    async fn send(&self, email: &Email) -> Result<(), EmailError> {
        let mail = self.renderer.render(&self.from, email)?;
        self.transport.send(&mail).await
    }
}

#[async_trait]
impl Activity for EmailActivity {
    fn name(&self) -> &'static str {
        SEND_MAIL
    }

    async fn execute(&self, ctx: &ActivityContext, input: serde_json::Value) -> ActivityResult {
        let request: SendMailRequest = match ActivityResult::parse_input(input) {
            Ok(r) => r,
            Err(failure) => return failure,
        };

        match self.send(&request.email).await {
            Ok(()) => {
                tracing::info!(
                    workflow_id = %ctx.workflow_id,
                    to = %request.email.to,
                    template = %request.email.template,
                    "Email sent"
                );
                ActivityResult::success(serde_json::json!({}))
            }
            Err(e) => {
                tracing::warn!(to = %request.email.to, error = %e, "Email not sent");
                ActivityResult::failure(e.to_string(), e.is_retryable())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Debug, Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<OutgoingMail>>,
    }

    #[async_trait]
    impl MailTransport for RecordingTransport {
        async fn send(&self, mail: &OutgoingMail) -> Result<(), EmailError> {
            self.sent.lock().push(mail.clone());
            Ok(())
        }
    }

    fn email() -> Email {
        Email::new(EMAIL_TEMPLATE, "jane@example.com")
            .with_variable("subject", "Loan <granted>")
            .with_variable("body", "Congratulations")
    }

    #[test]
    fn test_render_escapes_variables() {
        let renderer = EmailRenderer::new().unwrap();
        let mail = renderer.render("noreply@example.com", &email()).unwrap();
        assert_eq!(mail.subject, "Loan <granted>");
        assert!(mail.html.contains("Loan &lt;granted&gt;"));
        assert!(mail.html.contains("Congratulations"));
        assert_eq!(mail.from, "noreply@example.com");
    }

    #[test]
    fn test_unknown_template_is_final() {
        let renderer = EmailRenderer::new().unwrap();
        let err = renderer
            .render("a@b.c", &Email::new("welcome", "jane@example.com"))
            .unwrap_err();
        assert_eq!(err.to_string(), "Unknown email template 'welcome'");
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_activity_sends_through_transport() {
        let transport = Arc::new(RecordingTransport::default());
        let activity = EmailActivity::new(
            "noreply@example.com",
            Arc::new(EmailRenderer::new().unwrap()),
            transport.clone(),
        );

        let input = serde_json::to_value(SendMailRequest { email: email() }).unwrap();
        let result = activity.execute(&ActivityContext::default(), input).await;
        assert!(result.is_success());

        let sent = transport.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "jane@example.com");
    }

    #[tokio::test]
    async fn test_activity_rejects_bad_recipient() {
        let activity = EmailActivity::new(
            "noreply@example.com",
            Arc::new(EmailRenderer::new().unwrap()),
            Arc::new(LogTransport),
        );
        let mut bad = email();
        bad.to = "nobody".to_string();

        let input = serde_json::to_value(SendMailRequest { email: bad }).unwrap();
        let result = activity.execute(&ActivityContext::default(), input).await;
        assert!(result.is_non_retryable());
        assert_eq!(result.error_message(), Some("Invalid recipient 'nobody'"));
    }
}
