//! Parish Core - Shared types library.
//!
//! This crate provides common types used across all parish portal components:
//! - `client` - REST client, theme synchronizer and donation orchestrator
//! - `cli` - Command-line front-end
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no storage
//! access, no HTTP clients. This keeps it lightweight and allows it to be used
//! anywhere, including from tests that fake every collaborator.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids, emails, money, statuses, donation drafts and
//!   liturgical colors
//! - [`theme`] - Typography tokens and the CSS variable batch derived from a
//!   liturgical color

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod theme;
pub mod types;

pub use theme::{CssVariables, ThemeTokens, Treatment, theme_tokens};
pub use types::*;
