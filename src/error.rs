//! Unified error type hierarchy for kernreap.
//!
//! Provides structured error handling with ParseError for version-string
//! parsing, SystemError for package-manager process failures, and an
//! umbrella AppError used at module boundaries.

use std::io;
use std::process::ExitStatus;
use thiserror::Error;

/// Version-string parsing errors.
///
/// Raised only when the running-kernel identifier itself cannot be parsed;
/// malformed individual package records are skipped with a warning instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unrecognizable kernel version string: '{0}'")]
    UnrecognizableVersion(String),
}

/// Package-manager process invocation errors.
#[derive(Error, Debug)]
pub enum SystemError {
    /// The external command could not be started at all.
    #[error("failed to launch '{cmd}': {source}")]
    CommandLaunch {
        cmd: String,
        #[source]
        source: io::Error,
    },

    /// The external command ran but reported failure.
    #[error("command '{cmd}' failed: {reason}")]
    CommandFailed { cmd: String, reason: String },

    /// Effective uid is not root and the operation needs it.
    #[error("root privileges required for package removal")]
    InsufficientPrivileges,

    /// The removal command failed. The core does not know which packages,
    /// if any, were actually removed; callers must treat the installed
    /// state as uncertain and re-scan before retrying.
    #[error("removal command exited with {status}; installed state is uncertain")]
    RemovalFailed { status: ExitStatus },

    /// A package name failed validation before any command was assembled.
    #[error("invalid package name rejected before execution: '{0}'")]
    InvalidPackageName(String),

    /// A removal command was requested with nothing to remove.
    #[error("refusing to build a removal command with no packages")]
    EmptyRemovalList,
}

/// Global error type for all kernreap modules.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    System(#[from] SystemError),

    #[error("failed to encode JSON report: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = AppError> = std::result::Result<T, E>;
