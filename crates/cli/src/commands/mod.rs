//! CLI command implementations.

pub mod auth;
pub mod content;
pub mod donate;
pub mod theme;

use std::sync::Arc;

use parish_client::{
    ApiClient, AuthError, AuthService, ClientConfig, ClientError, ConfigError, ContentClient,
    DonationError, ErrorInfo, FileStorage, Storage, StorageError, StylesheetSink, SystemClock,
    ThemeSynchronizer,
};
use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by a command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Donation(#[from] DonationError),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

impl CommandError {
    /// Normalise into the uniform error shape.
    #[must_use]
    pub fn info(&self) -> ErrorInfo {
        match self {
            Self::Client(e) => e.info(),
            Self::Auth(e) => e.info(),
            Self::Donation(e) => e.info(),
            other => ErrorInfo::local(other.to_string()),
        }
    }
}

/// Services shared by every command.
pub struct Context {
    pub config: ClientConfig,
    pub storage: Arc<dyn Storage>,
    pub api: ApiClient,
}

impl Context {
    /// Open local storage and build the API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the state file is unreadable or the HTTP client
    /// cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, CommandError> {
        let storage: Arc<dyn Storage> = Arc::new(FileStorage::open(&config.state_file)?);
        let api = ApiClient::new(&config, Arc::clone(&storage))?;
        Ok(Self {
            config,
            storage,
            api,
        })
    }

    pub fn auth(&self) -> AuthService {
        AuthService::new(self.api.clone())
    }

    pub fn content(&self) -> ContentClient {
        ContentClient::new(self.api.clone())
    }

    /// Theme synchronizer writing to `PARISH_THEME_CSS` when configured.
    pub fn theme(&self) -> (ThemeSynchronizer<ApiClient>, Arc<StylesheetSink>) {
        let sink = Arc::new(
            self.config
                .theme_css_path
                .as_ref()
                .map_or_else(StylesheetSink::new, StylesheetSink::with_output),
        );
        let sync = ThemeSynchronizer::new(
            self.api.clone(),
            Arc::clone(&self.storage),
            Arc::new(SystemClock),
            sink.clone(),
        );
        (sync, sink)
    }
}

/// Print a value as pretty JSON.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CommandError> {
    let rendered = serde_json::to_string_pretty(value)?;
    print_line(&rendered);
    Ok(())
}

#[allow(clippy::print_stdout)]
pub fn print_line(line: &str) {
    println!("{line}");
}
