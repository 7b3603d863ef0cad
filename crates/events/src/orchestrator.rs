//! Decode → dispatch → persist sequencing for one verification event.
//!
//! An invocation moves through [`Stage::Decoding`], [`Stage::Dispatching`]
//! and [`Stage::Persisting`] to [`Stage::Done`]. A failure at any stage ends
//! the invocation with a [`VerificationError`] naming that stage:
//!
//! - decode failure: nothing was sent or written;
//! - dispatch failure: nothing was written;
//! - persist failure: the email *was* sent. The error carries the record so
//!   the insert can be replayed without sending again.
//!
//! There is no retry and no deduplication. Redelivery of the same event
//! sends and records again.

use std::fmt;
use std::sync::Arc;

use chrono::Duration;
use tracing::Instrument;
use verimail_core::{Clock, SystemClock, VerificationRecord};

use crate::decoder::{DecodeError, EventDecoder};
use crate::delivery::{DispatchError, EmailDispatcher};
use crate::store::{PersistError, RecordStore};

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// Position of an invocation in the decode → dispatch → persist sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Decoding,
    Dispatching,
    Persisting,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Decoding => "decoding",
            Self::Dispatching => "dispatching",
            Self::Persisting => "persisting",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Terminal failure of one invocation.
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// The provider accepted the email but the record was not written.
    #[error("Verification email sent but not recorded: {source}")]
    SentNotRecorded {
        record: VerificationRecord,
        #[source]
        source: PersistError,
    },
}

impl VerificationError {
    /// The stage the invocation failed in.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Decode(_) => Stage::Decoding,
            Self::Dispatch(_) => Stage::Dispatching,
            Self::SentNotRecorded { .. } => Stage::Persisting,
        }
    }

    /// Whether the email went out despite the failure.
    pub fn email_sent(&self) -> bool {
        matches!(self, Self::SentNotRecorded { .. })
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Runs verification events through decode, dispatch and persist.
///
/// Holds no per-invocation state; one instance serves concurrent calls.
pub struct Orchestrator {
    dispatcher: Arc<dyn EmailDispatcher>,
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    validity: Duration,
}

impl Orchestrator {
    /// Create an orchestrator using the system clock.
    pub fn new(
        dispatcher: Arc<dyn EmailDispatcher>,
        store: Arc<dyn RecordStore>,
        validity: Duration,
    ) -> Self {
        Self {
            dispatcher,
            store,
            clock: Arc::new(SystemClock),
            validity,
        }
    }

    /// Replace the time source used to stamp expiry.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Handle one event triggered by `resource`.
    ///
    /// Returns the record that was written on success.
    pub async fn handle(
        &self,
        resource: &str,
        payload: &[u8],
    ) -> Result<VerificationRecord, VerificationError> {
        let span = tracing::info_span!("verification", resource = %resource);
        async move {
            tracing::info!("Verification triggered by change to resource");

            let result = self.run(payload).await;
            match &result {
                Ok(_) => tracing::debug!(stage = %Stage::Done, "Verification complete"),
                Err(e) => tracing::error!(
                    stage = %e.stage(),
                    email_sent = e.email_sent(),
                    error = %e,
                    "Verification failed"
                ),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run(&self, payload: &[u8]) -> Result<VerificationRecord, VerificationError> {
        tracing::debug!(stage = %Stage::Decoding, "Stage entered");
        let request = EventDecoder::decode(payload)?;
        tracing::info!(email = %request.email, "Verification payload decoded");

        tracing::debug!(stage = %Stage::Dispatching, "Stage entered");
        let receipt = self
            .dispatcher
            .dispatch(&request.email, &request.token)
            .await?;
        let sent_at = self.clock.now();
        tracing::info!(
            status_code = receipt.status,
            body = %receipt.body,
            "Verification email sent"
        );

        tracing::debug!(stage = %Stage::Persisting, "Stage entered");
        let record = VerificationRecord::issue(&request, sent_at, self.validity);
        if let Err(source) = self.store.insert(&record).await {
            return Err(VerificationError::SentNotRecorded { record, source });
        }

        Ok(record)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
