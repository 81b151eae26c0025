//! Process exit codes and the top-level CLI error type.
//!
//! cachefs's own exit contract is simple (0 on a clean unmount, 1 on any
//! unrecoverable startup failure); `ExitCode` exists so the log line
//! preceding that exit can name a more specific BSD sysexits-style class,
//! the way a long-running daemon's startup failures usually do.

use std::io;

use derive_more::{Display, Error, From};

/// BSD sysexits-style classification, logged (not returned to the shell —
/// see [`CliError::process_exit_code`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitCode {
    Usage,
    NoHost,
    Unavailable,
    NoPermission,
    IoError,
    Software,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        match self {
            ExitCode::Usage => 64,
            ExitCode::NoHost => 68,
            ExitCode::Unavailable => 69,
            ExitCode::NoPermission => 77,
            ExitCode::IoError => 74,
            ExitCode::Software => 70,
        }
    }
}

pub trait ExitCodeError {
    fn exit_code(&self) -> ExitCode;
}

impl ExitCodeError for io::Error {
    fn exit_code(&self) -> ExitCode {
        match self.kind() {
            io::ErrorKind::NotConnected | io::ErrorKind::ConnectionRefused => ExitCode::NoHost,
            io::ErrorKind::PermissionDenied => ExitCode::NoPermission,
            io::ErrorKind::NotFound => ExitCode::IoError,
            _ => ExitCode::IoError,
        }
    }
}

pub type CliResult<T> = Result<T, CliError>;

/// Top-level error surfaced by `main`. Every variant maps to an
/// [`ExitCode`] for logging; the process itself always exits 0 or 1 per
/// the mandated contract (see [`CliError::process_exit_code`]).
#[derive(Debug, Display, Error, From)]
pub enum CliError {
    #[display(fmt = "{}", _0)]
    Usage(clap::Error),

    #[display(fmt = "{}", _0)]
    Io(io::Error),

    #[display(fmt = "no remote directory configured")]
    NoRemoteDirectory,

    #[display(fmt = "authentication failed for {}@{}", user, host)]
    AuthenticationFailed { host: String, user: String },

    #[display(fmt = "mount point {:?} is not a directory", _0)]
    InvalidMountpoint(std::path::PathBuf),
}

impl CliError {
    pub fn exit_class(&self) -> ExitCode {
        match self {
            CliError::Usage(_) => ExitCode::Usage,
            CliError::Io(e) => e.exit_code(),
            CliError::NoRemoteDirectory => ExitCode::Usage,
            CliError::AuthenticationFailed { .. } => ExitCode::NoPermission,
            CliError::InvalidMountpoint(_) => ExitCode::Usage,
        }
    }

    /// The actual process exit code: 0 is reserved for a clean shutdown, so
    /// every error path here is 1, matching the spec's two-valued exit
    /// contract regardless of how finely `exit_class` classifies it.
    pub fn process_exit_code(&self) -> i32 {
        1
    }
}
