//! Donation orchestration.
//!
//! Drives a validated [`DonationDraft`] through one of two payment flows:
//!
//! - **`PayPal`** (redirect): create an order, remember the donation id, send
//!   the donor to the approval URL. When they come back, the return token and
//!   the remembered id are paired into a [`PendingCapture`] that charges only
//!   after an explicit confirmation.
//! - **MTN Mobile Money** (push): create a request, then poll the backend
//!   through an [`MtnPollHandle`] until the donor approves or declines.

mod gateway;
mod mtn;
mod paypal;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use parish_core::{DonationDraft, DonationId, DonationValidationError, PaymentMethod};
use thiserror::Error;
use tracing::{info, instrument, warn};
use url::Url;

use crate::error::{ClientError, ErrorInfo};
use crate::storage::{Storage, keys};

pub use gateway::{
    DonationRecord, MtnPaymentRequest, MtnRequest, MtnStatus, MtnStatusQuery, PaymentGateway,
    PaymentMethodsStatus, PaypalCaptureRequest, PaypalOrder, PaypalOrderRequest,
};
pub use mtn::{MtnPollHandle, MtnPollState};
pub use paypal::{PendingCapture, RETURN_TOKEN_PARAM, return_token};

/// Errors that can occur during a donation.
#[derive(Debug, Error)]
pub enum DonationError {
    #[error(transparent)]
    Invalid(#[from] DonationValidationError),

    #[error("{} payments are currently unavailable", .0.label())]
    MethodUnavailable(PaymentMethod),

    /// The donor came back without an approval, or the pending donation was
    /// lost.
    #[error("Payment was cancelled or the donation could not be found")]
    Cancelled,

    #[error("This payment has already been processed")]
    AlreadyProcessed,

    /// The gateway reported a terminal failure.
    #[error("{0}")]
    PaymentFailed(String),

    #[error(transparent)]
    Client(#[from] ClientError),
}

impl DonationError {
    /// Normalise into the uniform error shape.
    #[must_use]
    pub fn info(&self) -> ErrorInfo {
        match self {
            Self::Client(e) => e.info(),
            other => ErrorInfo::local(other.to_string()),
        }
    }
}

/// Runs donations against a [`PaymentGateway`].
pub struct DonationOrchestrator<G> {
    gateway: Arc<G>,
    storage: Arc<dyn Storage>,
    poll_interval: Duration,
    methods: Mutex<PaymentMethodsStatus>,
}

impl<G: PaymentGateway> DonationOrchestrator<G> {
    #[must_use]
    pub fn new(gateway: Arc<G>, storage: Arc<dyn Storage>, poll_interval: Duration) -> Self {
        Self {
            gateway,
            storage,
            poll_interval,
            methods: Mutex::new(PaymentMethodsStatus::default()),
        }
    }

    /// Ask the backend which methods are enabled. A failed check leaves every
    /// method enabled.
    #[instrument(skip(self))]
    pub async fn check_payment_methods(&self) -> PaymentMethodsStatus {
        let status = match self.gateway.payment_methods_status().await {
            Ok(status) => status,
            Err(e) => {
                warn!(error = %e, "Payment method status check failed, leaving all enabled");
                PaymentMethodsStatus::default()
            }
        };
        *self.methods.lock().unwrap_or_else(PoisonError::into_inner) = status;
        status
    }

    /// Last known method availability.
    #[must_use]
    pub fn payment_methods(&self) -> PaymentMethodsStatus {
        *self.methods.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The donation id remembered across the `PayPal` redirect.
    #[must_use]
    pub fn pending_donation_id(&self) -> Option<DonationId> {
        self.storage
            .get(keys::PENDING_DONATION_ID)
            .filter(|id| !id.is_empty())
            .map(DonationId::from)
    }

    // =========================================================================
    // PayPal
    // =========================================================================

    /// Create a `PayPal` order and remember its donation id.
    ///
    /// The amount is converted to USD. The donation id is stored before the
    /// order is returned, so the caller can redirect straight to
    /// [`PaypalOrder::approval_url`].
    ///
    /// # Errors
    ///
    /// Validation errors are returned before any request is made.
    #[instrument(skip_all, fields(amount = %draft.amount, currency = %draft.currency))]
    pub async fn start_paypal(&self, draft: &DonationDraft) -> Result<PaypalOrder, DonationError> {
        let draft = self.prepare(draft, PaymentMethod::Paypal)?;
        let original = draft.money();
        let usd = original.to_usd()?;

        let request = PaypalOrderRequest {
            amount: usd.amount,
            currency: usd.currency,
            original_amount: original.amount,
            original_currency: original.currency,
            purpose: draft.purpose,
            purpose_description: draft.purpose_description,
            notes: draft.notes,
            is_anonymous: draft.is_anonymous,
            donor: draft.donor,
        };

        let order = self.gateway.create_paypal_order(&request).await?;
        self.storage
            .set(keys::PENDING_DONATION_ID, order.donation_id.as_str())
            .map_err(ClientError::from)?;

        info!(
            donation_id = %order.donation_id,
            original = %original,
            usd = %usd,
            "PayPal order created"
        );
        Ok(order)
    }

    /// Pair the return token with the remembered donation.
    ///
    /// # Errors
    ///
    /// `Cancelled` if the token or the pending donation id is missing. No
    /// request is made.
    pub fn resume_paypal(&self, token: Option<&str>) -> Result<PendingCapture<G>, DonationError> {
        let token = token.map(str::trim).filter(|t| !t.is_empty());
        let (Some(token), Some(donation_id)) = (token, self.pending_donation_id()) else {
            warn!("PayPal return without a token or pending donation");
            return Err(DonationError::Cancelled);
        };
        Ok(PendingCapture::new(
            Arc::clone(&self.gateway),
            Arc::clone(&self.storage),
            donation_id,
            token.to_owned(),
        ))
    }

    /// [`resume_paypal`](Self::resume_paypal) with the token read from the
    /// return URL.
    ///
    /// # Errors
    ///
    /// See [`resume_paypal`](Self::resume_paypal).
    pub fn resume_paypal_from_url(&self, url: &Url) -> Result<PendingCapture<G>, DonationError> {
        self.resume_paypal(return_token(url).as_deref())
    }

    // =========================================================================
    // MTN Mobile Money
    // =========================================================================

    /// Send a payment request to the donor's phone and start polling it.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Validation errors, including a missing phone number, are returned
    /// before any request is made.
    #[instrument(skip_all, fields(amount = %draft.amount, currency = %draft.currency))]
    pub async fn start_mtn(&self, draft: &DonationDraft) -> Result<MtnPollHandle, DonationError> {
        let draft = self.prepare(draft, PaymentMethod::MtnMobileMoney)?;
        let phone_number = draft
            .phone()
            .map(str::to_owned)
            .ok_or(DonationValidationError::PhoneRequired)?;

        let request = MtnPaymentRequest {
            amount: draft.amount,
            currency: draft.currency,
            phone_number,
            purpose: draft.purpose,
            purpose_description: draft.purpose_description,
            notes: draft.notes,
            is_anonymous: draft.is_anonymous,
            donor: draft.donor,
        };

        let created = self.gateway.create_mtn_request(&request).await?;
        info!(
            donation_id = %created.donation_id,
            reference_id = %created.reference_id,
            "MTN payment request sent"
        );
        Ok(mtn::spawn(
            Arc::clone(&self.gateway),
            created,
            self.poll_interval,
        ))
    }

    /// Check availability and validate the draft for `method`, returning the
    /// draft with its email normalised.
    fn prepare(
        &self,
        draft: &DonationDraft,
        method: PaymentMethod,
    ) -> Result<DonationDraft, DonationError> {
        if !self.payment_methods().is_enabled(method) {
            return Err(DonationError::MethodUnavailable(method));
        }
        let mut draft = draft.clone();
        draft.payment_method = method;
        let email = draft.validate()?;
        draft.donor.email = email.into_inner();
        Ok(draft)
    }
}
