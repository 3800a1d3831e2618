//! Parish Client - talks to the parish REST backend.
//!
//! # Architecture
//!
//! Everything goes through [`api::ApiClient`], which owns the HTTP connection
//! pool, the cookie jar holding the refresh token, and the shared session
//! refresh. Services sit on top of it:
//!
//! - [`auth`] - Sign-in, registration and admin-console gating
//! - [`content`] - Cached CRUD over the admin-console collections
//! - [`theme`] - Liturgical color theme with a midnight re-fetch
//! - [`donation`] - `PayPal` and MTN Mobile Money donation flows
//!
//! Local state (tokens, the pending `PayPal` donation, today's color) lives in
//! a [`storage::Storage`]; "today" comes from a [`clock::Clock`]. Both are
//! injected so services can be driven deterministically in tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod auth;
pub mod clock;
pub mod config;
pub mod content;
pub mod donation;
pub mod error;
pub mod storage;
pub mod theme;

pub use api::ApiClient;
pub use auth::{AuthError, AuthService, RegisterForm, UserSession};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ClientConfig, ConfigError, Environment};
pub use content::{ContentClient, ContentKind, Resource};
pub use donation::{DonationError, DonationOrchestrator, PaymentGateway};
pub use error::{ClientError, ErrorInfo};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};
pub use theme::{
    FetchOutcome, LiturgicalColorSource, StylesheetSink, ThemePhase, ThemeSink, ThemeSnapshot,
    ThemeSynchronizer, ThemeWatch,
};
