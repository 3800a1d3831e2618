//! Donation form drafts and their client-side validation.
//!
//! A draft has no identity; it becomes a donation once the backend issues a
//! [`DonationId`](crate::DonationId) for it.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::email::{Email, EmailError};
use super::money::{Currency, Money};
use super::status::PaymentMethod;

/// What a donation is given for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DonationPurpose {
    #[default]
    General,
    Tithe,
    Offering,
    BuildingFund,
    MassIntention,
    Charity,
    Mission,
    /// Requires a free-text `purpose_description`.
    Other,
}

impl std::str::FromStr for DonationPurpose {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "general" => Ok(Self::General),
            "tithe" => Ok(Self::Tithe),
            "offering" => Ok(Self::Offering),
            "building-fund" => Ok(Self::BuildingFund),
            "mass-intention" => Ok(Self::MassIntention),
            "charity" => Ok(Self::Charity),
            "mission" => Ok(Self::Mission),
            "other" => Ok(Self::Other),
            _ => Err(format!("invalid donation purpose: {s}")),
        }
    }
}

/// The person giving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Donor {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Errors caught before any network call is made.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DonationValidationError {
    #[error("Donation amount must be greater than zero")]
    NonPositiveAmount,
    #[error("Donation amount is too large")]
    AmountTooLarge,
    #[error("Donation amount is below the minimum of 0.01 USD")]
    AmountTooSmall,
    #[error("Donor name is required")]
    MissingName,
    #[error("A valid email address is required: {0}")]
    InvalidEmail(#[from] EmailError),
    #[error("Please describe the purpose of your donation")]
    MissingPurposeDescription,
    #[error("Phone number is required for MTN Mobile Money payments")]
    PhoneRequired,
}

/// A donation form as filled in by the donor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationDraft {
    pub amount: Decimal,
    pub currency: Currency,
    pub purpose: DonationPurpose,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub is_anonymous: bool,
    pub donor: Donor,
    pub payment_method: PaymentMethod,
}

impl DonationDraft {
    /// The amount as entered, in the draft's currency.
    #[must_use]
    pub const fn money(&self) -> Money {
        Money::new(self.amount, self.currency)
    }

    /// Trimmed phone number, if one was entered.
    #[must_use]
    pub fn phone(&self) -> Option<&str> {
        self.donor
            .phone
            .as_deref()
            .map(str::trim)
            .filter(|phone| !phone.is_empty())
    }

    /// Validate the draft for its selected payment method.
    ///
    /// Returns the parsed donor email on success.
    ///
    /// # Errors
    ///
    /// Returns the first rule the draft breaks. A missing phone number is only
    /// an error when the payment method is MTN Mobile Money.
    pub fn validate(&self) -> Result<Email, DonationValidationError> {
        if self.amount <= Decimal::ZERO {
            return Err(DonationValidationError::NonPositiveAmount);
        }

        if !self.is_anonymous && self.donor.name.trim().is_empty() {
            return Err(DonationValidationError::MissingName);
        }

        let email = Email::parse(&self.donor.email)?;

        if self.purpose == DonationPurpose::Other
            && self
                .purpose_description
                .as_deref()
                .is_none_or(|description| description.trim().is_empty())
        {
            return Err(DonationValidationError::MissingPurposeDescription);
        }

        if self.payment_method == PaymentMethod::MtnMobileMoney && self.phone().is_none() {
            return Err(DonationValidationError::PhoneRequired);
        }

        Ok(email)
    }
}
