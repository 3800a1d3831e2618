//! Confirmation step of a `PayPal` donation after the donor returns from the
//! approval page.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parish_core::{DonationId, DonationStatus};
use tracing::{info, instrument, warn};
use url::Url;

use super::DonationError;
use super::gateway::{DonationRecord, PaymentGateway, PaypalCaptureRequest};
use crate::storage::{Storage, keys};

/// The query parameter `PayPal` appends to the return URL.
pub const RETURN_TOKEN_PARAM: &str = "token";

/// Extract the approval token from a `PayPal` return URL.
#[must_use]
pub fn return_token(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == RETURN_TOKEN_PARAM)
        .map(|(_, value)| value.trim().to_owned())
        .filter(|token| !token.is_empty())
}

/// An approved order waiting for the donor to confirm the charge.
///
/// [`confirm`](Self::confirm) captures at most once: a second call while the
/// first is running, or after it succeeded, is rejected without contacting
/// the backend. A failed capture re-arms it so the donor can retry.
pub struct PendingCapture<G> {
    gateway: Arc<G>,
    storage: Arc<dyn Storage>,
    donation_id: DonationId,
    order_id: String,
    processed: AtomicBool,
}

impl<G: PaymentGateway> PendingCapture<G> {
    pub(super) fn new(
        gateway: Arc<G>,
        storage: Arc<dyn Storage>,
        donation_id: DonationId,
        order_id: String,
    ) -> Self {
        Self {
            gateway,
            storage,
            donation_id,
            order_id,
            processed: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub const fn donation_id(&self) -> &DonationId {
        &self.donation_id
    }

    #[must_use]
    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    /// Capture the payment.
    ///
    /// # Errors
    ///
    /// - `AlreadyProcessed` if a capture is running or already succeeded
    /// - `PaymentFailed` if the backend did not complete the donation
    /// - `Client` if the capture request failed
    #[instrument(skip(self), fields(donation_id = %self.donation_id))]
    pub async fn confirm(&self) -> Result<DonationRecord, DonationError> {
        if self.processed.swap(true, Ordering::AcqRel) {
            warn!("Capture already processed");
            return Err(DonationError::AlreadyProcessed);
        }

        let request = PaypalCaptureRequest {
            donation_id: self.donation_id.clone(),
            order_id: self.order_id.clone(),
        };

        match self.gateway.capture_paypal_order(&request).await {
            Ok(record) if record.status == DonationStatus::Completed => {
                if let Err(e) = self.storage.remove(keys::PENDING_DONATION_ID) {
                    warn!(error = %e, "Failed to clear pending donation");
                }
                info!(amount = %record.amount, currency = %record.currency, "Donation captured");
                Ok(record)
            }
            Ok(record) => {
                self.processed.store(false, Ordering::Release);
                tracing::error!(status = %record.status, "Capture did not complete the donation");
                Err(DonationError::PaymentFailed(format!(
                    "Payment was not completed (status: {})",
                    record.status
                )))
            }
            Err(e) => {
                self.processed.store(false, Ordering::Release);
                tracing::error!(error = %e, "Capture request failed");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_return_token() {
        let url = Url::parse("https://parish.example/donate/success?token=5O190127TN364715T&PayerID=X")
            .unwrap();
        assert_eq!(return_token(&url).as_deref(), Some("5O190127TN364715T"));

        let empty = Url::parse("https://parish.example/donate/success?token=").unwrap();
        assert_eq!(return_token(&empty), None);

        let missing = Url::parse("https://parish.example/donate/cancel").unwrap();
        assert_eq!(return_token(&missing), None);
    }
}
