//! Payment endpoints of the parish backend.
//!
//! The backend fronts both payment providers; the client never talks to
//! `PayPal` or MTN directly.

use std::future::Future;

use chrono::{DateTime, Utc};
use parish_core::{
    Currency, DonationId, DonationPurpose, DonationStatus, Donor, PaymentMethod,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::instrument;

use crate::api::ApiClient;
use crate::content::Resource;
use crate::error::Result;

// =============================================================================
// Wire types
// =============================================================================

/// `POST /donations/paypal/create-order`. Amounts are always USD.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaypalOrderRequest {
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub currency: Currency,
    #[serde(with = "rust_decimal::serde::float")]
    pub original_amount: Decimal,
    pub original_currency: Currency,
    pub purpose: DonationPurpose,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub is_anonymous: bool,
    pub donor: Donor,
}

/// An order awaiting the donor's approval on `PayPal`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaypalOrder {
    pub donation_id: DonationId,
    pub approval_url: String,
    #[serde(default)]
    pub order_id: Option<String>,
}

/// `POST /donations/paypal/capture`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaypalCaptureRequest {
    pub donation_id: DonationId,
    /// The token `PayPal` appended to the return URL.
    pub order_id: String,
}

/// `POST /donations/mtn/create-request`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MtnPaymentRequest {
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub currency: Currency,
    pub phone_number: String,
    pub purpose: DonationPurpose,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub is_anonymous: bool,
    pub donor: Donor,
}

/// A push request sent to the donor's phone.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MtnRequest {
    pub donation_id: DonationId,
    pub reference_id: String,
}

/// `POST /donations/mtn/check-status` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MtnStatusQuery {
    pub donation_id: DonationId,
    pub reference_id: String,
}

/// Current state of an MTN request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MtnStatus {
    pub status: DonationStatus,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub donation: Option<DonationRecord>,
}

/// Which payment methods the backend currently accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodsStatus {
    #[serde(default = "enabled")]
    pub paypal: bool,
    #[serde(default = "enabled")]
    pub mtn_mobile_money: bool,
}

const fn enabled() -> bool {
    true
}

impl Default for PaymentMethodsStatus {
    fn default() -> Self {
        Self {
            paypal: true,
            mtn_mobile_money: true,
        }
    }
}

impl PaymentMethodsStatus {
    #[must_use]
    pub const fn is_enabled(self, method: PaymentMethod) -> bool {
        match method {
            PaymentMethod::Paypal => self.paypal,
            PaymentMethod::MtnMobileMoney => self.mtn_mobile_money,
        }
    }
}

/// A donation as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationRecord {
    #[serde(alias = "_id")]
    pub id: DonationId,
    pub amount: Decimal,
    pub currency: Currency,
    pub status: DonationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<DonationPurpose>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for DonationRecord {
    const PATH: &'static str = "donations";
    type Id = DonationId;
}

// =============================================================================
// PaymentGateway
// =============================================================================

/// The payment operations the donation flows depend on.
pub trait PaymentGateway: Send + Sync + 'static {
    fn payment_methods_status(
        &self,
    ) -> impl Future<Output = Result<PaymentMethodsStatus>> + Send;

    fn create_paypal_order(
        &self,
        request: &PaypalOrderRequest,
    ) -> impl Future<Output = Result<PaypalOrder>> + Send;

    fn capture_paypal_order(
        &self,
        request: &PaypalCaptureRequest,
    ) -> impl Future<Output = Result<DonationRecord>> + Send;

    fn create_mtn_request(
        &self,
        request: &MtnPaymentRequest,
    ) -> impl Future<Output = Result<MtnRequest>> + Send;

    fn check_mtn_status(
        &self,
        query: &MtnStatusQuery,
    ) -> impl Future<Output = Result<MtnStatus>> + Send;
}

impl PaymentGateway for ApiClient {
    #[instrument(skip(self))]
    async fn payment_methods_status(&self) -> Result<PaymentMethodsStatus> {
        self.get("donations/payment-methods/status").await
    }

    #[instrument(skip_all, fields(amount = %request.amount))]
    async fn create_paypal_order(&self, request: &PaypalOrderRequest) -> Result<PaypalOrder> {
        self.post("donations/paypal/create-order", request).await
    }

    #[instrument(skip_all, fields(donation_id = %request.donation_id))]
    async fn capture_paypal_order(&self, request: &PaypalCaptureRequest) -> Result<DonationRecord> {
        let captured: CaptureResponse = self.post("donations/paypal/capture", request).await?;
        Ok(captured.into_record())
    }

    #[instrument(skip_all, fields(amount = %request.amount, currency = %request.currency))]
    async fn create_mtn_request(&self, request: &MtnPaymentRequest) -> Result<MtnRequest> {
        self.post("donations/mtn/create-request", request).await
    }

    #[instrument(skip_all, fields(reference_id = %query.reference_id))]
    async fn check_mtn_status(&self, query: &MtnStatusQuery) -> Result<MtnStatus> {
        self.post("donations/mtn/check-status", query).await
    }
}

/// Capture answers with the record either bare or under `donation`.
#[derive(Deserialize)]
#[serde(untagged)]
enum CaptureResponse {
    Wrapped { donation: DonationRecord },
    Bare(DonationRecord),
}

impl CaptureResponse {
    fn into_record(self) -> DonationRecord {
        match self {
            Self::Wrapped { donation } | Self::Bare(donation) => donation,
        }
    }
}
