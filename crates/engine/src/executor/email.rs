//! Email step executor (SMTP via lettre).

use async_trait::async_trait;
use serde_json::{json, Value};

use flowline_core::workflow::ActionType;

use super::{StepContext, StepExecutor};
use crate::config::EmailConfig;
use crate::error::ExecError;

/// Sends a plain-text email over SMTP.
pub struct SendEmailExecutor {
    config: Option<EmailConfig>,
}

impl SendEmailExecutor {
    pub fn new(config: Option<EmailConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl StepExecutor for SendEmailExecutor {
    fn action_type(&self) -> ActionType {
        ActionType::SendEmail
    }

    async fn execute(&self, ctx: &StepContext<'_>) -> Result<Value, ExecError> {
        use lettre::{
            message::header::ContentType, transport::smtp::authentication::Credentials,
            AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
        };

        let config = self
            .config
            .as_ref()
            .ok_or_else(|| ExecError::Config("SMTP is not configured (SMTP_HOST unset)".into()))?;

        let to = ctx.str_field("to")?;
        let subject = ctx.str_field("subject")?;
        let body = ctx.str_field("body")?;

        let email = Message::builder()
            .from(
                config
                    .from_address
                    .parse()
                    .map_err(|e| ExecError::Config(format!("invalid from address: {e}")))?,
            )
            .to(to
                .parse()
                .map_err(|e| ExecError::Config(format!("invalid recipient '{to}': {e}")))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| ExecError::Config(format!("failed to build email: {e}")))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| ExecError::External(format!("SMTP relay setup failed: {e}")))?
            .port(config.smtp_port);

        if let (Some(user), Some(password)) = (&config.smtp_user, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), password.clone()));
        }

        let mailer = builder.build();
        mailer
            .send(email)
            .await
            .map_err(|e| ExecError::External(format!("SMTP send failed: {e}")))?;

        tracing::info!(to, "Email sent");

        Ok(json!({ "to": to, "subject": subject }))
    }
}
