//! Donation commands.
//!
//! # Usage
//!
//! ```bash
//! parish donate methods
//! parish donate paypal --amount 6000 --currency XAF -n "Marie" -e marie@example.com
//! parish donate paypal-return --url "https://parish.example/donate/success?token=EC-1" --confirm
//! parish donate mtn --amount 5000 --currency XAF -n "Marie" -e marie@example.com --phone 237670000000
//! ```

use std::sync::Arc;

use clap::{Args, Subcommand};
use parish_client::{ApiClient, DonationOrchestrator};
use parish_core::{Currency, DonationDraft, DonationPurpose, Donor, PaymentMethod};
use rust_decimal::Decimal;
use tracing::info;
use url::Url;

use super::{CommandError, Context, print_json, print_line};

#[derive(Subcommand)]
pub enum DonateAction {
    /// Show which payment methods are available
    Methods,
    /// Start a PayPal donation and print the approval link
    Paypal(DonationArgs),
    /// Finish a PayPal donation from the URL PayPal returned to
    PaypalReturn {
        /// The full return URL, including its `token` parameter
        #[arg(long)]
        url: Url,

        /// Capture the payment (without this flag the donation is only checked)
        #[arg(long)]
        confirm: bool,
    },
    /// Donate with MTN Mobile Money and wait for approval on the phone
    Mtn {
        #[command(flatten)]
        donation: DonationArgs,

        /// Phone number that receives the payment prompt
        #[arg(long)]
        phone: String,
    },
}

#[derive(Args)]
pub struct DonationArgs {
    /// Amount in the chosen currency
    #[arg(long)]
    amount: Decimal,

    /// Currency (USD, EUR, GBP, XAF)
    #[arg(long, default_value = "USD")]
    currency: Currency,

    /// Purpose (general, tithe, offering, building-fund, mass-intention,
    /// charity, mission, other)
    #[arg(long, default_value = "general")]
    purpose: DonationPurpose,

    /// Description, required when the purpose is "other"
    #[arg(long)]
    purpose_description: Option<String>,

    /// Note for the parish office
    #[arg(long)]
    notes: Option<String>,

    /// Hide the donor's name from parish listings
    #[arg(long)]
    anonymous: bool,

    /// Donor name
    #[arg(short, long, default_value = "")]
    name: String,

    /// Donor email
    #[arg(short, long)]
    email: String,
}

impl DonationArgs {
    fn into_draft(self, method: PaymentMethod, phone: Option<String>) -> DonationDraft {
        DonationDraft {
            amount: self.amount,
            currency: self.currency,
            purpose: self.purpose,
            purpose_description: self.purpose_description,
            notes: self.notes,
            is_anonymous: self.anonymous,
            donor: Donor {
                name: self.name,
                email: self.email,
                phone,
            },
            payment_method: method,
        }
    }
}

pub async fn run(ctx: &Context, action: DonateAction) -> Result<(), CommandError> {
    let orchestrator = DonationOrchestrator::new(
        Arc::new(ctx.api.clone()),
        Arc::clone(&ctx.storage),
        ctx.config.mtn_poll_interval,
    );

    match action {
        DonateAction::Methods => {
            let status = orchestrator.check_payment_methods().await;
            print_json(&status)
        }
        DonateAction::Paypal(args) => {
            orchestrator.check_payment_methods().await;
            let order = orchestrator
                .start_paypal(&args.into_draft(PaymentMethod::Paypal, None))
                .await?;
            print_line(&format!("Donation {} created.", order.donation_id));
            print_line(&format!("Approve the payment at: {}", order.approval_url));
            Ok(())
        }
        DonateAction::PaypalReturn { url, confirm } => {
            paypal_return(&orchestrator, &url, confirm).await
        }
        DonateAction::Mtn { donation, phone } => {
            orchestrator.check_payment_methods().await;
            let handle = orchestrator
                .start_mtn(&donation.into_draft(PaymentMethod::MtnMobileMoney, Some(phone)))
                .await?;
            print_line(&format!(
                "Payment request {} sent. Approve it on your phone.",
                handle.reference_id()
            ));
            let finished = handle.wait().await?;
            info!(donation_id = %handle.donation_id(), checks = finished.checks, "MTN donation completed");
            print_line("Thank you! Your donation has been received.");
            if let Some(donation) = finished.donation {
                print_json(&donation)?;
            }
            Ok(())
        }
    }
}

async fn paypal_return(
    orchestrator: &DonationOrchestrator<ApiClient>,
    url: &Url,
    confirm: bool,
) -> Result<(), CommandError> {
    let capture = orchestrator.resume_paypal_from_url(url)?;
    if !confirm {
        print_line(&format!(
            "Donation {} is approved and ready. Re-run with --confirm to complete the payment.",
            capture.donation_id()
        ));
        return Ok(());
    }

    let record = capture.confirm().await?;
    print_line("Thank you! Your donation has been received.");
    print_json(&record)
}
