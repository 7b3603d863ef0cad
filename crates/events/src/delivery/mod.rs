//! Verification email delivery.
//!
//! [`EmailDispatcher`] is the seam the orchestrator sends through. Two
//! providers implement it: [`sendgrid::SendGridDispatcher`] (HTTP API,
//! template or rendered content) and [`email::SmtpDispatcher`] (SMTP,
//! rendered content).

pub mod email;
pub mod sendgrid;

use std::sync::Arc;

use async_trait::async_trait;
use verimail_core::verification_url;

use self::email::{DeliveryProvider, EmailConfig, SmtpDispatcher};
use self::sendgrid::SendGridDispatcher;

/// Subject line for rendered (non-template) verification emails.
pub const VERIFICATION_SUBJECT: &str = "Verify Your Email Address";

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for verification email delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// A required setting (base URL, API key, SMTP host) is missing.
    #[error("Email delivery not configured: {0}")]
    Config(&'static str),

    /// The recipient is empty or not a valid address.
    #[error("Invalid recipient: {0}")]
    Recipient(String),

    /// The HTTP request to the provider failed (network, DNS, timeout).
    #[error("Provider request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider answered with a non-2xx status.
    #[error("Provider rejected send with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    /// A sender or recipient address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

// ---------------------------------------------------------------------------
// Dispatcher seam
// ---------------------------------------------------------------------------

/// What the provider said when it accepted a send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    /// HTTP status for SendGrid, SMTP reply code for SMTP.
    pub status: u16,
    /// Opaque response body, possibly empty.
    pub body: String,
}

/// Sends one verification email.
///
/// Success means the provider accepted the message; it may still be queued.
#[async_trait]
pub trait EmailDispatcher: Send + Sync {
    async fn dispatch(&self, email: &str, token: &str) -> Result<DeliveryReceipt, DispatchError>;
}

/// Build the dispatcher selected by `config.provider`.
pub fn build_dispatcher(config: EmailConfig) -> Arc<dyn EmailDispatcher> {
    match config.provider {
        DeliveryProvider::SendGrid => Arc::new(SendGridDispatcher::new(config)),
        DeliveryProvider::Smtp => Arc::new(SmtpDispatcher::new(config)),
    }
}

// ---------------------------------------------------------------------------
// Message content
// ---------------------------------------------------------------------------

/// Everything a provider needs to address and render one verification email.
#[derive(Debug, Clone)]
pub struct VerificationEmail {
    pub to: String,
    pub link: String,
    pub contact_link: Option<String>,
}

impl VerificationEmail {
    /// Validate inputs against config and build the link.
    pub fn prepare(config: &EmailConfig, to: &str, token: &str) -> Result<Self, DispatchError> {
        if config.verification_url.trim().is_empty() {
            return Err(DispatchError::Config("VERIFICATION_URL is not set"));
        }
        if to.trim().is_empty() {
            return Err(DispatchError::Recipient("empty address".into()));
        }
        Ok(Self {
            to: to.to_string(),
            link: verification_url(&config.verification_url, token),
            contact_link: config.contact_link.clone(),
        })
    }

    pub fn plain_text(&self) -> String {
        format!(
            "Please verify your email address by clicking on the link: {}",
            self.link
        )
    }

    /// The link is escaped for both the attribute and the text node, since
    /// the token is opaque upstream input.
    pub fn html(&self) -> String {
        format!(
            "Please verify your email address by clicking on the link: <a href=\"{0}\">{0}</a>",
            escape_html(&self.link)
        )
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
