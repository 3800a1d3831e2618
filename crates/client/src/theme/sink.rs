//! Where an applied theme ends up.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use parish_core::CssVariables;
use tracing::debug;

/// Receives the complete variable batch for one applied color.
///
/// Implementations must treat the batch as a unit: after `apply` returns,
/// either every variable is visible or none changed.
pub trait ThemeSink: Send + Sync {
    /// Apply one batch of theme variables.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the batch could not be written out.
    fn apply(&self, variables: &CssVariables) -> io::Result<()>;
}

/// Renders the batch into a `:root { ... }` stylesheet held in memory and,
/// optionally, written to a file.
#[derive(Debug, Default)]
pub struct StylesheetSink {
    css: Mutex<Option<String>>,
    output: Option<PathBuf>,
}

impl StylesheetSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Also write each applied stylesheet to `path`.
    #[must_use]
    pub fn with_output(path: impl Into<PathBuf>) -> Self {
        Self {
            css: Mutex::new(None),
            output: Some(path.into()),
        }
    }

    /// The most recently applied stylesheet.
    #[must_use]
    pub fn stylesheet(&self) -> Option<String> {
        self.css
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }
}

impl ThemeSink for StylesheetSink {
    fn apply(&self, variables: &CssVariables) -> io::Result<()> {
        let css = variables.render();
        if let Some(path) = &self.output {
            // Rename over the target so readers never see a partial file.
            let staging = path.with_extension("css.tmp");
            fs::write(&staging, &css)?;
            fs::rename(&staging, path)?;
            debug!(path = %path.display(), "Theme stylesheet written");
        }
        *self.css.lock().unwrap_or_else(PoisonError::into_inner) = Some(css);
        Ok(())
    }
}
