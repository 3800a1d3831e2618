//! Content and liturgical color override commands.
//!
//! # Usage
//!
//! ```bash
//! parish content list announcements
//! parish override list
//! parish override set --date 2026-12-13 --color rose --reason "Gaudete Sunday"
//! parish override delete 65f1c0
//! ```

use chrono::NaiveDate;
use clap::Subcommand;
use parish_client::ContentKind;
use parish_client::content::LiturgicalColorOverride;
use parish_core::{LiturgicalColor, OverrideId};
use tracing::info;

use super::{CommandError, Context, print_json, print_line};

#[derive(Subcommand)]
pub enum ContentAction {
    /// List a collection (announcements, events, ministries, gallery,
    /// sermons, mass-schedules, donations, users, color-overrides)
    List {
        kind: ContentKind,
    },
}

#[derive(Subcommand)]
pub enum OverrideAction {
    /// List color overrides
    List,
    /// Set the color for a date and refresh today's theme
    Set {
        /// Date the override applies to (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,

        /// Liturgical color
        #[arg(long)]
        color: LiturgicalColor,

        /// Why the calendar color is overridden
        #[arg(long)]
        reason: Option<String>,
    },
    /// Remove an override and refresh today's theme
    Delete {
        id: String,
    },
}

pub async fn run(ctx: &Context, action: ContentAction) -> Result<(), CommandError> {
    match action {
        ContentAction::List { kind } => {
            if kind.is_admin_only() {
                ctx.auth().require_admin()?;
            }
            let items = ctx.content().list_raw(kind).await?;
            info!(kind = %kind, count = items.len(), "Listed content");
            print_json(&items)
        }
    }
}

pub async fn run_override(ctx: &Context, action: OverrideAction) -> Result<(), CommandError> {
    let content = ctx.content();

    match action {
        OverrideAction::List => {
            let overrides = content.list::<LiturgicalColorOverride>().await?;
            print_json(&overrides)
        }
        OverrideAction::Set {
            date,
            color,
            reason,
        } => {
            ctx.auth().require_admin()?;
            let created = content
                .create(&LiturgicalColorOverride {
                    id: None,
                    date,
                    color,
                    reason,
                })
                .await?;
            print_json(&created)?;
            refresh_theme(ctx).await
        }
        OverrideAction::Delete { id } => {
            ctx.auth().require_admin()?;
            content
                .delete::<LiturgicalColorOverride>(&OverrideId::new(id))
                .await?;
            print_line("Override removed");
            refresh_theme(ctx).await
        }
    }
}

/// An override can change today's color, so the cached theme is replaced.
async fn refresh_theme(ctx: &Context) -> Result<(), CommandError> {
    let (sync, _) = ctx.theme();
    sync.refresh_color().await?;
    if let Some(state) = sync.snapshot().active {
        print_line(&format!("Theme is now {} ({})", state.color, state.date));
    }
    Ok(())
}
