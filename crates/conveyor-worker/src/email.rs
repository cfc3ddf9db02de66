//! Email executor.

use crate::executor::Executor;
use async_trait::async_trait;
use conveyor_config::SmtpConfig;
use conveyor_core::{ConveyorError, ConveyorResult, Job, SendEmailPayload};
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

/// Sends email jobs through a configured SMTP relay.
pub struct SendEmailExecutor {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SendEmailExecutor {
    /// Creates an executor against the configured relay.
    pub fn new(config: &SmtpConfig) -> ConveyorResult<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| ConveyorError::Configuration(format!("invalid SMTP config: {e}")))?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .timeout(Some(config.timeout()))
            .build();

        Ok(Self { transport })
    }
}

fn parse_mailbox(address: &str) -> ConveyorResult<Mailbox> {
    address
        .parse()
        .map_err(|_| ConveyorError::executor(format!("invalid email address: {address}")))
}

#[async_trait]
impl Executor for SendEmailExecutor {
    async fn execute(&self, job: &Job) -> ConveyorResult<()> {
        let payload: SendEmailPayload = serde_json::from_value(job.payload.clone())
            .map_err(|e| ConveyorError::executor(format!("invalid email payload: {e}")))?;

        let message = Message::builder()
            .from(parse_mailbox(&payload.from)?)
            .to(parse_mailbox(&payload.to)?)
            .subject(payload.subject.clone())
            .body(payload.body.clone())
            .map_err(|e| ConveyorError::executor(format!("failed to build email: {e}")))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| ConveyorError::executor(format!("failed to send email: {e}")))?;

        debug!(job_id = %job.id, to = %payload.to, "email sent");

        Ok(())
    }
}
