//! Domain types shared by the verimail crates.
//!
//! - [`types`] — primitive aliases (`DbId`, `Timestamp`).
//! - [`verification`] — the request decoded from an event, the record
//!   written after a successful send, and the verification link format.
//! - [`clock`] — the time source used to stamp record expiry.

pub mod clock;
pub mod types;
pub mod verification;

pub use clock::{Clock, FixedClock, SystemClock};
pub use types::{DbId, Timestamp};
pub use verification::{verification_url, VerificationRecord, VerificationRequest};
