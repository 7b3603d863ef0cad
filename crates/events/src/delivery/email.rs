//! Delivery configuration and the SMTP provider.
//!
//! [`EmailConfig`] carries the settings for both providers; it is loaded
//! once at startup with [`EmailConfig::from_env`]. Missing credentials do
//! not fail startup: the dispatcher reports them as
//! [`DispatchError::Config`] when a send is attempted.
//!
//! [`SmtpDispatcher`] wraps the `lettre` async SMTP transport and sends the
//! rendered plain-text/HTML variant of the verification email.

use std::str::FromStr;

use async_trait::async_trait;

use super::{
    DeliveryReceipt, DispatchError, EmailDispatcher, VerificationEmail, VERIFICATION_SUBJECT,
};

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when `EMAIL_FROM` is not set.
const DEFAULT_FROM_ADDRESS: &str = "no-reply@verimail.local";

/// Default sender display name when `EMAIL_FROM_NAME` is not set.
const DEFAULT_FROM_NAME: &str = "Verimail";

/// SendGrid v3 send endpoint.
pub const DEFAULT_SENDGRID_API_URL: &str = "https://api.sendgrid.com/v3/mail/send";

/// Which provider carries verification emails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryProvider {
    #[default]
    SendGrid,
    Smtp,
}

impl FromStr for DeliveryProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sendgrid" => Ok(Self::SendGrid),
            "smtp" => Ok(Self::Smtp),
            other => Err(format!("unknown delivery provider '{other}'")),
        }
    }
}

/// Configuration for verification email delivery.
#[derive(Clone)]
pub struct EmailConfig {
    pub provider: DeliveryProvider,
    /// Base of the verification link; the token is appended as `?token=`.
    pub verification_url: String,
    /// Support link passed to the template as `contactLink`.
    pub contact_link: Option<String>,
    /// RFC 5322 "From" address.
    pub from_address: String,
    pub from_name: String,
    pub sendgrid_api_key: String,
    pub sendgrid_api_url: String,
    /// SendGrid dynamic template id. Without one the rendered bodies are sent.
    pub template_id: Option<String>,
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            provider: DeliveryProvider::default(),
            verification_url: String::new(),
            contact_link: None,
            from_address: DEFAULT_FROM_ADDRESS.to_string(),
            from_name: DEFAULT_FROM_NAME.to_string(),
            sendgrid_api_key: String::new(),
            sendgrid_api_url: DEFAULT_SENDGRID_API_URL.to_string(),
            template_id: None,
            smtp_host: None,
            smtp_port: DEFAULT_SMTP_PORT,
            smtp_user: None,
            smtp_password: None,
        }
    }
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable            | Default                                 |
    /// |---------------------|-----------------------------------------|
    /// | `DELIVERY_PROVIDER` | `sendgrid` (or `smtp`)                  |
    /// | `VERIFICATION_URL`  | empty (sends fail until set)            |
    /// | `CONTACT_LINK`      | —                                       |
    /// | `EMAIL_FROM`        | `no-reply@verimail.local`               |
    /// | `EMAIL_FROM_NAME`   | `Verimail`                              |
    /// | `SENDGRID_API_KEY`  | empty (sends fail until set)            |
    /// | `SENDGRID_API_URL`  | `https://api.sendgrid.com/v3/mail/send` |
    /// | `TEMPLATE_ID`       | —                                       |
    /// | `SMTP_HOST`         | —                                       |
    /// | `SMTP_PORT`         | `587`                                   |
    /// | `SMTP_USER`         | —                                       |
    /// | `SMTP_PASSWORD`     | —                                       |
    pub fn from_env() -> Self {
        let provider = std::env::var("DELIVERY_PROVIDER")
            .ok()
            .map(|p| p.parse().expect("DELIVERY_PROVIDER must be 'sendgrid' or 'smtp'"))
            .unwrap_or_default();

        Self {
            provider,
            verification_url: std::env::var("VERIFICATION_URL").unwrap_or_default(),
            contact_link: non_empty_var("CONTACT_LINK"),
            from_address: std::env::var("EMAIL_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            from_name: std::env::var("EMAIL_FROM_NAME")
                .unwrap_or_else(|_| DEFAULT_FROM_NAME.to_string()),
            sendgrid_api_key: std::env::var("SENDGRID_API_KEY").unwrap_or_default(),
            sendgrid_api_url: std::env::var("SENDGRID_API_URL")
                .unwrap_or_else(|_| DEFAULT_SENDGRID_API_URL.to_string()),
            template_id: non_empty_var("TEMPLATE_ID"),
            smtp_host: non_empty_var("SMTP_HOST"),
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            smtp_user: non_empty_var("SMTP_USER"),
            smtp_password: non_empty_var("SMTP_PASSWORD"),
        }
    }
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("provider", &self.provider)
            .field("verification_url", &self.verification_url)
            .field("from_address", &self.from_address)
            .field("template_id", &self.template_id)
            .field("sendgrid_api_key_set", &!self.sendgrid_api_key.is_empty())
            .field("smtp_host", &self.smtp_host)
            .finish_non_exhaustive()
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

// ---------------------------------------------------------------------------
// SmtpDispatcher
// ---------------------------------------------------------------------------

/// Sends verification emails via SMTP.
pub struct SmtpDispatcher {
    config: EmailConfig,
}

impl SmtpDispatcher {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Assemble the multipart (plain + HTML) message.
    fn build_message(&self, email: &VerificationEmail) -> Result<lettre::Message, DispatchError> {
        use lettre::message::{Mailbox, MultiPart};

        let from = Mailbox::new(
            Some(self.config.from_name.clone()),
            self.config.from_address.parse()?,
        );
        let to = Mailbox::new(None, email.to.parse()?);

        lettre::Message::builder()
            .from(from)
            .to(to)
            .subject(VERIFICATION_SUBJECT)
            .multipart(MultiPart::alternative_plain_html(
                email.plain_text(),
                email.html(),
            ))
            .map_err(|e| DispatchError::Build(e.to_string()))
    }
}

#[async_trait]
impl EmailDispatcher for SmtpDispatcher {
    async fn dispatch(&self, to: &str, token: &str) -> Result<DeliveryReceipt, DispatchError> {
        use lettre::{
            transport::smtp::authentication::Credentials, AsyncSmtpTransport, AsyncTransport,
            Tokio1Executor,
        };

        let host = self
            .config
            .smtp_host
            .as_deref()
            .ok_or(DispatchError::Config("SMTP_HOST is not set"))?;

        let email = VerificationEmail::prepare(&self.config, to, token)?;
        let message = self.build_message(&email)?;

        let mut transport_builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
            .port(self.config.smtp_port);

        if let (Some(user), Some(pass)) = (&self.config.smtp_user, &self.config.smtp_password) {
            transport_builder =
                transport_builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        let mailer = transport_builder.build();
        let response = mailer.send(message).await?;
        let receipt = receipt_from(&response);

        tracing::info!(to, status = receipt.status, "Verification email accepted by SMTP relay");
        Ok(receipt)
    }
}

/// Reduce the relay's final reply to a receipt: numeric code plus the reply
/// lines joined with newlines.
fn receipt_from(response: &lettre::transport::smtp::response::Response) -> DeliveryReceipt {
    DeliveryReceipt {
        status: response.code().to_string().parse().unwrap_or(250),
        body: response.message().collect::<Vec<_>>().join("\n"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
