//! Liturgical color theme commands.
//!
//! # Usage
//!
//! ```bash
//! parish theme show
//! parish theme refresh
//! parish theme css --out public/liturgical.css
//! parish theme watch
//! ```

use std::path::PathBuf;

use clap::Subcommand;
use parish_client::FetchOutcome;
use tracing::info;

use super::{CommandError, Context, print_json, print_line};

#[derive(Subcommand)]
pub enum ThemeAction {
    /// Apply today's color (cached for the day) and show it
    Show,
    /// Fetch today's color, bypassing the cache
    Refresh,
    /// Print the theme stylesheet
    Css {
        /// Write the stylesheet to this file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Keep the theme current, refreshing at every local midnight
    Watch,
}

pub async fn run(ctx: &Context, action: ThemeAction) -> Result<(), CommandError> {
    let (sync, sink) = ctx.theme();

    match action {
        ThemeAction::Show => {
            sync.initialize().await?;
            print_json(&sync.snapshot())
        }
        ThemeAction::Refresh => {
            let outcome = sync.refresh_color().await?;
            if let FetchOutcome::Applied(state) = outcome {
                info!(color = %state.color, "Theme refreshed");
            }
            print_json(&sync.snapshot())
        }
        ThemeAction::Css { out } => {
            sync.initialize().await?;
            let css = sink.stylesheet().unwrap_or_default();
            match out {
                Some(path) => {
                    std::fs::write(&path, css)?;
                    info!(path = %path.display(), "Stylesheet written");
                }
                None => print_line(css.trim_end()),
            }
            Ok(())
        }
        ThemeAction::Watch => {
            if let Err(e) = sync.initialize().await {
                tracing::warn!(error = %e, "Initial theme fetch failed, waiting for midnight");
            }
            let watch = sync.watch();
            info!("Watching for the next liturgical day; press Ctrl-C to stop");
            tokio::signal::ctrl_c().await?;
            watch.stop();
            info!("Theme watcher stopped");
            Ok(())
        }
    }
}
