//! Status polling for MTN Mobile Money requests.
//!
//! The donor approves the push on their phone; the backend learns the
//! outcome from MTN. The poller asks the backend at a fixed cadence until the
//! donation reaches a terminal status. The first check happens one interval
//! after the request was created, and a tick that comes due while a check is
//! still running is skipped rather than queued. A failed check is logged and
//! the next tick tries again.

use std::sync::Arc;
use std::time::Duration;

use parish_core::{DonationId, DonationStatus};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, warn};

use super::DonationError;
use super::gateway::{DonationRecord, MtnRequest, MtnStatusQuery, PaymentGateway};

/// What the poller has learned so far.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MtnPollState {
    pub status: DonationStatus,
    pub message: Option<String>,
    pub donation: Option<DonationRecord>,
    /// Successful status checks so far.
    pub checks: u32,
}

/// A running MTN poller. Dropping the handle stops polling.
#[derive(Debug)]
pub struct MtnPollHandle {
    donation_id: DonationId,
    reference_id: String,
    state: watch::Receiver<MtnPollState>,
    task: JoinHandle<()>,
}

impl MtnPollHandle {
    #[must_use]
    pub const fn donation_id(&self) -> &DonationId {
        &self.donation_id
    }

    #[must_use]
    pub fn reference_id(&self) -> &str {
        &self.reference_id
    }

    /// Latest known status.
    #[must_use]
    pub fn status(&self) -> DonationStatus {
        self.state.borrow().status
    }

    #[must_use]
    pub fn state(&self) -> MtnPollState {
        self.state.borrow().clone()
    }

    /// Wait for a terminal status.
    ///
    /// # Errors
    ///
    /// `PaymentFailed` when the donation failed or was cancelled, `Cancelled`
    /// if the poller stopped before a terminal status.
    pub async fn wait(&self) -> Result<MtnPollState, DonationError> {
        let mut state = self.state.clone();
        let terminal = state
            .wait_for(|s| s.status.is_terminal())
            .await
            .map_err(|_| DonationError::Cancelled)?
            .clone();

        if terminal.status == DonationStatus::Completed {
            Ok(terminal)
        } else {
            Err(DonationError::PaymentFailed(terminal.message.unwrap_or_else(
                || format!("Mobile money payment {}", terminal.status),
            )))
        }
    }
}

impl Drop for MtnPollHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Start polling `request` every `period`.
///
/// Must be called from within a tokio runtime.
pub(super) fn spawn<G: PaymentGateway>(
    gateway: Arc<G>,
    request: MtnRequest,
    period: Duration,
) -> MtnPollHandle {
    let (tx, rx) = watch::channel(MtnPollState::default());
    let query = MtnStatusQuery {
        donation_id: request.donation_id.clone(),
        reference_id: request.reference_id.clone(),
    };

    let task = tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            match gateway.check_mtn_status(&query).await {
                Ok(checked) => {
                    let status = checked.status;
                    debug!(reference_id = %query.reference_id, %status, "MTN status checked");
                    tx.send_modify(|state| {
                        state.status = status;
                        state.message = checked.message;
                        state.donation = checked.donation;
                        state.checks += 1;
                    });
                    if status.is_terminal() {
                        info!(donation_id = %query.donation_id, %status, "MTN payment finished");
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, reference_id = %query.reference_id, "MTN status check failed, retrying");
                }
            }
        }
    });

    MtnPollHandle {
        donation_id: request.donation_id,
        reference_id: request.reference_id,
        state: rx,
        task,
    }
}
