//! Study configuration.
//!
//! A TOML file is parsed into raw serde structs and validated into
//! [`ExpreccsConfig`] before any simulator is launched:
//!
//! ```toml
//! [simulator]
//! executable = "flow"
//!
//! [grid]
//! regional_dims = [1000.0, 1000.0, 20.0]
//! regional_cells = [10, 10, 2]
//! site_location = [300.0, 300.0, 0.0, 700.0, 700.0, 20.0]
//! site_cells = [8, 8, 2]
//!
//! [schedule]
//! injection = [[100.0, 10.0, 5.0]]
//! time_interp = "interp"
//!
//! [boundary]
//! kind = "pres"
//!
//! [coupling]
//! iterations = 2
//!
//! [decks]
//! reference = "decks/REFERENCE.DATA"
//! regional = "decks/REGIONAL.DATA"
//! site = "decks/SITE.DATA"
//! ```

mod settings;

use std::path::PathBuf;

use thiserror::Error;

pub use settings::{DeckTemplates, ExpreccsConfig, ScheduleConfig, SimulatorConfig};

/// Error type for configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file unreadable.
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// TOML syntax or type error.
    #[error("cannot parse {}: {source}", .path.display())]
    Toml {
        /// File involved (`<string>` when parsed from memory).
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: toml::de::Error,
    },

    /// A value that fails validation.
    #[error("invalid {key}: {reason}")]
    Invalid {
        /// Dotted key.
        key: String,
        /// What is wrong.
        reason: String,
    },

    /// A required key is absent.
    #[error("missing required key {0}")]
    Missing(String),
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}
