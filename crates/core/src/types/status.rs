//! Status and role enums shared by the client and the CLI.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a donation.
///
/// `Pending` is the only non-terminal state; a donation leaves it through a
/// `PayPal` capture or an MTN status poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DonationStatus {
    #[default]
    Pending,
    Completed,
    Failed,
    Cancelled,
}

impl DonationStatus {
    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for DonationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Payment backend chosen on the donation form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentMethod {
    /// Redirect-based checkout, captured after the donor returns.
    Paypal,
    /// Push-based mobile money, confirmed on the donor's phone.
    MtnMobileMoney,
}

impl PaymentMethod {
    /// Name shown to donors.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Paypal => "PayPal",
            Self::MtnMobileMoney => "MTN Mobile Money",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Paypal => write!(f, "paypal"),
            Self::MtnMobileMoney => write!(f, "mtn-mobile-money"),
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "paypal" => Ok(Self::Paypal),
            "mtn" | "mtn-mobile-money" => Ok(Self::MtnMobileMoney),
            _ => Err(format!("invalid payment method: {s}")),
        }
    }
}

/// Role carried by a logged-in user session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UserRole {
    /// Full access to the admin console including user management.
    Admin,
    /// Content management without user administration.
    Editor,
    /// Registered member; public pages and own profile only.
    Parishioner,
    Priest,
    ParishPriest,
}

impl UserRole {
    /// Whether the role may open the admin console.
    #[must_use]
    pub const fn can_access_admin(self) -> bool {
        !matches!(self, Self::Parishioner)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Editor => write!(f, "editor"),
            Self::Parishioner => write!(f, "parishioner"),
            Self::Priest => write!(f, "priest"),
            Self::ParishPriest => write!(f, "parish-priest"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "editor" => Ok(Self::Editor),
            "parishioner" => Ok(Self::Parishioner),
            "priest" => Ok(Self::Priest),
            "parish-priest" => Ok(Self::ParishPriest),
            _ => Err(format!("invalid user role: {s}")),
        }
    }
}
