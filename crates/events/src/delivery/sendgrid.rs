//! SendGrid v3 HTTP delivery.
//!
//! [`SendGridDispatcher`] POSTs a single-recipient message to the
//! `/v3/mail/send` endpoint. With a `TEMPLATE_ID` configured the message
//! references the dynamic template and passes `verificationLink` and
//! `contactLink`; otherwise the rendered plain-text and HTML bodies are
//! sent inline. There is no retry: redelivery is the trigger's job.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use super::email::EmailConfig;
use super::{
    DeliveryReceipt, DispatchError, EmailDispatcher, VerificationEmail, VERIFICATION_SUBJECT,
};

/// HTTP request timeout for a single send.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct SendGridMessage<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: Address<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    template_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    subject: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    content: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: Vec<Address<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dynamic_template_data: Option<TemplateData<'a>>,
}

#[derive(Debug, Serialize)]
struct Address<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TemplateData<'a> {
    verification_link: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    contact_link: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(rename = "type")]
    kind: &'static str,
    value: String,
}

// ---------------------------------------------------------------------------
// SendGridDispatcher
// ---------------------------------------------------------------------------

/// Sends verification emails through the SendGrid HTTP API.
pub struct SendGridDispatcher {
    client: reqwest::Client,
    config: EmailConfig,
}

impl SendGridDispatcher {
    /// Create a dispatcher with a pre-configured HTTP client.
    pub fn new(config: EmailConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self { client, config }
    }

    fn build_message<'a>(&'a self, email: &'a VerificationEmail) -> SendGridMessage<'a> {
        let to = vec![Address {
            email: email.to.as_str(),
            name: None,
        }];
        let from = Address {
            email: self.config.from_address.as_str(),
            name: Some(self.config.from_name.as_str()),
        };

        match self.config.template_id.as_deref() {
            Some(template_id) => SendGridMessage {
                personalizations: vec![Personalization {
                    to,
                    dynamic_template_data: Some(TemplateData {
                        verification_link: email.link.as_str(),
                        contact_link: email.contact_link.as_deref(),
                    }),
                }],
                from,
                template_id: Some(template_id),
                subject: None,
                content: Vec::new(),
            },
            None => SendGridMessage {
                personalizations: vec![Personalization {
                    to,
                    dynamic_template_data: None,
                }],
                from,
                template_id: None,
                subject: Some(VERIFICATION_SUBJECT),
                content: vec![
                    Content {
                        kind: "text/plain",
                        value: email.plain_text(),
                    },
                    Content {
                        kind: "text/html",
                        value: email.html(),
                    },
                ],
            },
        }
    }
}

#[async_trait]
impl EmailDispatcher for SendGridDispatcher {
    async fn dispatch(&self, to: &str, token: &str) -> Result<DeliveryReceipt, DispatchError> {
        if self.config.sendgrid_api_key.trim().is_empty() {
            return Err(DispatchError::Config("SENDGRID_API_KEY is not set"));
        }

        let email = VerificationEmail::prepare(&self.config, to, token)?;
        let message = self.build_message(&email);

        let response = self
            .client
            .post(&self.config.sendgrid_api_url)
            .bearer_auth(&self.config.sendgrid_api_key)
            .json(&message)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(
            to,
            status_code = status.as_u16(),
            body = %body,
            "Verification email accepted by SendGrid"
        );
        Ok(DeliveryReceipt {
            status: status.as_u16(),
            body,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
