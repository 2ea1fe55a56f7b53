//! File formats shared with the external simulator.
//!
//! - **Binary archives**: `EGRID`, `INIT` and restart files as keyed arrays,
//!   behind the [`SimulationArchive`] trait
//! - **Include files**: region tags, multipliers, `BCCON` and `BCPROP`
//! - **Decks**: `INCLUDE` insertion and `TSTEP` replacement
//!
//! # Example
//!
//! ```no_run
//! use expreccs::io::{EclArchive, RestartLayout, SimulationArchive};
//!
//! let archive = EclArchive::open("output/regional/REGIONAL", RestartLayout::Unified).unwrap();
//! let pressure = archive.restart_global("PRESSURE", archive.n_steps() - 1).unwrap();
//! println!("{} cells, last report at {} s", pressure.len(), archive.report_times()[0]);
//! ```

mod archive;
mod deck;
mod ecl;
mod include;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::grid::GridError;

pub use archive::{MemoryArchive, SimulationArchive};
pub use deck::DeckRewriter;
pub use ecl::{
    EclArchive, EclRecord, EclValues, RestartLayout, egrid_records, read_egrid, read_file,
    read_records, write_case, write_file, write_records,
};
pub use include::{
    BcconRow, BcpropKind, write_bccon, write_bccon_file, write_bcprop, write_bcprop_file,
    write_int_include, write_real_include, write_values,
};

/// Error type for archive, include and deck files.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// I/O error on a specific file.
    #[error("{}: {source}", .path.display())]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// File content that cannot be interpreted.
    #[error("{}: {reason}", .path.display())]
    Malformed {
        /// File involved.
        path: PathBuf,
        /// What is wrong.
        reason: String,
    },

    /// Requested keyword absent.
    #[error("keyword {keyword} not found")]
    MissingKeyword {
        /// Keyword name.
        keyword: String,
    },

    /// Restart step beyond the last one.
    #[error("report step {step} requested but only {available} available")]
    StepOutOfRange {
        /// Requested step.
        step: usize,
        /// Steps present.
        available: usize,
    },

    /// Array length fits neither all nor active cells.
    #[error("{keyword} has {found} values, expected {expected}")]
    SizeMismatch {
        /// Keyword name.
        keyword: String,
        /// Values present.
        found: usize,
        /// Values expected.
        expected: usize,
    },

    /// Deck text that cannot be rewritten.
    #[error("deck line {line}: {reason}")]
    Deck {
        /// One-based line.
        line: usize,
        /// What is wrong.
        reason: String,
    },

    /// Grid arrays inconsistent.
    #[error(transparent)]
    Grid(#[from] GridError),
}

impl ArchiveError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        ArchiveError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn malformed(path: &Path, reason: impl Into<String>) -> Self {
        ArchiveError::Malformed {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}
