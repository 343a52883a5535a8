//! Outgoing email.
//!
//! Handlers build an [`EmailMessage`] and hand it to the configured
//! [`EmailSender`]. Delivery is synchronous with the request: a failed send is
//! reported back on the form. Production uses the Resend HTTP API; mock mode
//! only logs the message so codes can be read from the server output.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{Instrument, info, info_span};

use super::pages::escape;

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Email delivery abstraction.
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Deliver a message or return the provider's error.
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Development sender that logs the message instead of delivering it.
#[derive(Clone, Debug)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(
            to = %message.to,
            subject = %message.subject,
            text = %message.text,
            "mock email"
        );
        Ok(())
    }
}

#[derive(Serialize)]
struct ResendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct ResendErrorBody {
    message: String,
}

/// Delivers email through the Resend HTTP API.
#[derive(Debug)]
pub struct ResendEmailSender {
    client: Client,
    endpoint: String,
    api_key: SecretString,
    from: String,
}

impl ResendEmailSender {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(api_key: SecretString, from: String) -> Result<Self> {
        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build email HTTP client")?;
        Ok(Self {
            client,
            endpoint: RESEND_ENDPOINT.to_string(),
            api_key,
            from,
        })
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = endpoint;
        self
    }
}

#[async_trait]
impl EmailSender for ResendEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let body = ResendRequest {
            from: &self.from,
            to: [message.to.as_str()],
            subject: &message.subject,
            html: &message.html,
            text: &message.text,
        };
        let span = info_span!("email.send", email.provider = "resend", email.subject = %message.subject);
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .instrument(span)
            .await
            .context("failed to reach email provider")?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let detail = response
            .json::<ResendErrorBody>()
            .await
            .map_or_else(|_| status.to_string(), |body| body.message);
        Err(anyhow!("email provider rejected message: {detail}"))
    }
}

/// Email carrying the signup verification link and code.
#[must_use]
pub fn onboarding_email(to: &str, verify_url: &str, otp: &str) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: "Welcome to Grape Stack!".to_string(),
        html: format!(
            "<h1>Welcome to Grape Stack!</h1>\
<p>Here's your verification code: <strong>{otp}</strong></p>\
<p>Or click the link to get started: <a href=\"{url}\">{url}</a></p>",
            otp = escape(otp),
            url = escape(verify_url),
        ),
        text: format!(
            "Welcome to Grape Stack!\n\nHere's your verification code: {otp}\n\nOr open this link to get started: {verify_url}\n"
        ),
    }
}

/// Email carrying the password reset link and code.
#[must_use]
pub fn password_reset_email(to: &str, verify_url: &str, otp: &str) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: "Grape Stack Password Reset".to_string(),
        html: format!(
            "<h1>Grape Stack Password Reset</h1>\
<p>Here's your verification code: <strong>{otp}</strong></p>\
<p>Or click the link: <a href=\"{url}\">{url}</a></p>",
            otp = escape(otp),
            url = escape(verify_url),
        ),
        text: format!(
            "Grape Stack Password Reset\n\nHere's your verification code: {otp}\n\nOr open this link: {verify_url}\n"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn onboarding_email_contains_code_and_link() {
        let url = "https://grapestack.dev/verify?type=onboarding&target=a%40b.co&code=ABC123";
        let message = onboarding_email("a@b.co", url, "ABC123");
        assert_eq!(message.subject, "Welcome to Grape Stack!");
        assert_eq!(message.to, "a@b.co");
        assert!(message.text.contains("ABC123"));
        assert!(message.text.contains(url));
        assert!(message.html.contains("&amp;target="));
    }

    #[test]
    fn password_reset_email_subject() {
        let message = password_reset_email("a@b.co", "https://x/verify", "ZZZ999");
        assert_eq!(message.subject, "Grape Stack Password Reset");
        assert!(message.html.contains("<strong>ZZZ999</strong>"));
    }

    #[tokio::test]
    async fn log_sender_accepts_everything() -> Result<()> {
        LogEmailSender
            .send(&onboarding_email("a@b.co", "https://x", "CODE12"))
            .await
    }

    #[tokio::test]
    async fn resend_sender_reports_unreachable_provider() -> Result<()> {
        let sender = ResendEmailSender::new(
            SecretString::from("re_test".to_string()),
            "Grape Stack <hello@grapestack.dev>".to_string(),
        )?
        .with_endpoint("http://127.0.0.1:9/emails".to_string());
        let result = sender
            .send(&password_reset_email("a@b.co", "https://x", "CODE12"))
            .await;
        assert!(result.is_err());
        Ok(())
    }
}
