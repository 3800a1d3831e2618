//! Core types for the parish portal.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod donation;
pub mod email;
pub mod id;
pub mod liturgical;
pub mod money;
pub mod status;

pub use donation::{DonationDraft, DonationPurpose, DonationValidationError, Donor};
pub use email::{Email, EmailError};
pub use id::*;
pub use liturgical::{
    LiturgicalColor, LiturgicalColorPayload, LiturgicalColorState, SHADE_STOPS, ShadeRamp,
    ShadeRampError, UnknownColor,
};
pub use money::{Currency, Money};
pub use status::*;
