//! Crate-level error type.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::grid::GridError;
use crate::io::ArchiveError;
use crate::simulation::SimulatorError;
use crate::time::ScheduleError;

/// Broad failure classes, for reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input detected before any simulator run.
    Configuration,
    /// Grids or footprint that the projection cannot handle.
    Geometry,
    /// The external simulator failed.
    ExternalTool,
    /// Files missing, unreadable or malformed.
    Io,
}

/// Any error raised by the library.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration file problems.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Grid construction or geometric preconditions.
    #[error(transparent)]
    Grid(#[from] GridError),

    /// Binary archives, include files and decks.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Simulator runs.
    #[error(transparent)]
    Simulator(#[from] SimulatorError),

    /// Report schedules.
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    /// Other file system failures.
    #[error("{}: {source}", .path.display())]
    Io {
        /// Path involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Failure class.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(_) | Error::Schedule(_) => ErrorKind::Configuration,
            Error::Grid(e) if e.is_configuration() => ErrorKind::Configuration,
            Error::Grid(_) | Error::Archive(ArchiveError::Grid(_)) => ErrorKind::Geometry,
            Error::Simulator(SimulatorError::Io { .. }) => ErrorKind::Io,
            Error::Simulator(_) => ErrorKind::ExternalTool,
            Error::Archive(_) | Error::Io { .. } => ErrorKind::Io,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Side;

    #[test]
    fn test_kinds() {
        let config: Error = ConfigError::Missing("grid".into()).into();
        assert_eq!(config.kind(), ErrorKind::Configuration);
        let partition: Error = GridError::InvalidPartition {
            axis: 'x',
            reason: "zero".into(),
        }
        .into();
        assert_eq!(partition.kind(), ErrorKind::Configuration);
        let edge: Error = GridError::FootprintTouchesDomainEdge { side: Side::North }.into();
        assert_eq!(edge.kind(), ErrorKind::Geometry);
        let tool: Error = SimulatorError::NonZeroExit {
            program: "flow".into(),
            name: "site".into(),
            code: Some(2),
        }
        .into();
        assert_eq!(tool.kind(), ErrorKind::ExternalTool);
        assert!(tool.to_string().contains("exit code 2"));
        let missing: Error = ArchiveError::MissingKeyword {
            keyword: "PRESSURE".into(),
        }
        .into();
        assert_eq!(missing.kind(), ErrorKind::Io);
    }
}
