//! Verification email event handling.
//!
//! One inbound event produces one invocation of [`Orchestrator::handle`]:
//!
//! - [`decoder`] — turns the raw payload into a
//!   [`VerificationRequest`](verimail_core::VerificationRequest).
//! - [`delivery`] — sends the email through SendGrid or SMTP.
//! - [`store`] — writes the issued token to Postgres over a scoped
//!   connection.
//! - [`orchestrator`] — sequences the three and classifies failures.

pub mod decoder;
pub mod delivery;
pub mod orchestrator;
pub mod store;

pub use decoder::{DecodeError, EventDecoder};
pub use delivery::email::{DeliveryProvider, EmailConfig};
pub use delivery::{build_dispatcher, DeliveryReceipt, DispatchError, EmailDispatcher};
pub use orchestrator::{Orchestrator, Stage, VerificationError};
pub use store::{PersistError, PersistPhase, PgRecordStore, RecordStore};
