//! Parish CLI - liturgical theme, content and donations from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Show today's liturgical color (cached for the day)
//! parish theme show
//!
//! # Write the theme stylesheet and keep it current across midnight
//! parish theme css --out public/liturgical.css
//! parish theme watch
//!
//! # Sign in and override a date's color
//! parish login -e priest@example.com
//! parish override set --date 2026-12-13 --color rose --reason "Gaudete Sunday"
//!
//! # Donate
//! parish donate paypal --amount 6000 --currency XAF --name "Marie" --email marie@example.com
//! parish donate paypal-return --url "https://parish.example/donate/success?token=EC-1" --confirm
//! parish donate mtn --amount 5000 --currency XAF --name "Marie" --email marie@example.com --phone 237670000000
//! ```
//!
//! # Environment Variables
//!
//! See `parish_client::config` for the full list. `SENTRY_DSN` enables error
//! tracking; `RUST_LOG` controls log output.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use parish_client::ClientConfig;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{CommandError, Context};

#[derive(Parser)]
#[command(name = "parish")]
#[command(author, version, about = "Parish portal command-line client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Liturgical color theme
    Theme {
        #[command(subcommand)]
        action: commands::theme::ThemeAction,
    },
    /// Sign in
    Login(commands::auth::LoginArgs),
    /// Sign out and clear the local session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Create an account
    Register(commands::auth::RegisterArgs),
    /// Browse portal content
    Content {
        #[command(subcommand)]
        action: commands::content::ContentAction,
    },
    /// Manage liturgical color overrides
    Override {
        #[command(subcommand)]
        action: commands::content::OverrideAction,
    },
    /// Make a donation
    Donate {
        #[command(subcommand)]
        action: commands::donate::DonateAction,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: Some(std::borrow::Cow::Borrowed(config.environment.as_str())),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "parish_cli=info,parish_client=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    // Configuration errors are reported once tracing is up.
    let config = ClientConfig::from_env();
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);

    let result = match config {
        Ok(config) => run(cli, config).await,
        Err(e) => Err(CommandError::from(e)),
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {}", e.info());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: ClientConfig) -> Result<(), CommandError> {
    let ctx = Context::new(config)?;

    match cli.command {
        Commands::Theme { action } => commands::theme::run(&ctx, action).await,
        Commands::Login(args) => commands::auth::login(&ctx, args).await,
        Commands::Logout => commands::auth::logout(&ctx).await,
        Commands::Whoami => commands::auth::whoami(&ctx),
        Commands::Register(args) => commands::auth::register(&ctx, args).await,
        Commands::Content { action } => commands::content::run(&ctx, action).await,
        Commands::Override { action } => commands::content::run_override(&ctx, action).await,
        Commands::Donate { action } => commands::donate::run(&ctx, action).await,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use url::Url;

    use super::*;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn config() -> ClientConfig {
        ClientConfig::for_api_url(Url::parse("http://127.0.0.1:9/api").unwrap())
    }

    #[test]
    fn test_sentry_start_reaches_installed_subscriber() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .finish();
        let mut config = config();
        config.sentry_dsn = Some("https://public@127.0.0.1/1".to_string());

        let guard = tracing::subscriber::with_default(subscriber, || init_sentry(&config));

        assert!(guard.is_some());
        let logs = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("Sentry initialized"), "{logs}");
    }

    #[test]
    fn test_sentry_disabled_without_dsn() {
        assert!(init_sentry(&config()).is_none());
    }
}
