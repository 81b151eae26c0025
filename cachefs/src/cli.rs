//! Command-line parsing and logger setup, following the teacher's split
//! between `clap::Parser` for arguments and `flexi_logger` for output.

use std::path::PathBuf;

use clap::Parser;
use flexi_logger::{FileSpec, LevelFilter, LogSpecification, Logger};

use crate::error::{CliError, CliResult};

const DEFAULT_CACHE_TIMEOUT_SECS: u64 = 5 * 60;
const DEFAULT_PORT: u16 = 22;

/// Mounts a remote directory, reached over SFTP, as a local FUSE
/// filesystem backed by an on-disk block and metadata cache.
#[derive(Parser, Debug)]
#[command(name = "cachefs", version, about)]
pub struct Opt {
    /// Remote host to connect to.
    pub host: String,

    /// Local directory to mount the filesystem at.
    pub mountpoint: PathBuf,

    /// SSH port.
    #[arg(short = 'p', long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Remote username; defaults to the current local user.
    #[arg(short = 'u', long)]
    pub user: Option<String>,

    /// Remote directory to mount; defaults to the remote home directory.
    #[arg(short = 'd', long = "remotedir")]
    pub remote_dir: Option<String>,

    /// Seconds a cached metadata entry remains valid before a fresh
    /// `lstat`/`readdir`/`readlink` is required.
    #[arg(long, default_value_t = DEFAULT_CACHE_TIMEOUT_SECS)]
    pub cachetimeout: u64,

    /// Run in the foreground and raise the log level to debug.
    #[arg(long)]
    pub debug: bool,

    /// Write logs to this file instead of stderr.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Increase verbosity; repeatable.
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Opt {
    pub fn resolved_user(&self) -> String {
        self.user.clone().unwrap_or_else(whoami::username)
    }

    pub fn resolved_remote_dir(&self) -> Option<String> {
        self.remote_dir.clone()
    }

    /// Sets up `flexi_logger` with module-scoped targets for `cachefs` and
    /// `cachefs_ssh`, mirroring the five named loggers (`main`, `sftp`,
    /// `metadata`, `data`, `fuse`) the original tool configured separately.
    pub fn init_logger(&self) -> CliResult<()> {
        let level = if self.debug || self.verbose > 0 {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        };

        let mut builder = LogSpecification::builder();
        builder.default(LevelFilter::Warn);
        for module in ["cachefs", "cachefs_ssh"] {
            builder.module(module, level);
        }

        let mut logger = Logger::with(builder.build());
        logger = if let Some(path) = &self.log_file {
            logger
                .log_to_file(FileSpec::try_from(path).map_err(|e| {
                    CliError::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
                })?)
                .duplicate_to_stderr(flexi_logger::Duplicate::Warn)
        } else {
            logger.log_to_stderr()
        };

        logger
            .start()
            .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_required_positionals() {
        let opt = Opt::parse_from(["cachefs", "example.com", "/mnt/x"]);
        assert_eq!(opt.host, "example.com");
        assert_eq!(opt.mountpoint, PathBuf::from("/mnt/x"));
        assert_eq!(opt.port, DEFAULT_PORT);
        assert_eq!(opt.cachetimeout, DEFAULT_CACHE_TIMEOUT_SECS);
        assert!(!opt.debug);
    }

    #[test]
    fn parses_optional_flags() {
        let opt = Opt::parse_from([
            "cachefs",
            "example.com",
            "/mnt/x",
            "-p",
            "2222",
            "-u",
            "bob",
            "-d",
            "/srv/data",
            "--cachetimeout",
            "30",
            "--debug",
        ]);
        assert_eq!(opt.port, 2222);
        assert_eq!(opt.user.as_deref(), Some("bob"));
        assert_eq!(opt.remote_dir.as_deref(), Some("/srv/data"));
        assert_eq!(opt.cachetimeout, 30);
        assert!(opt.debug);
    }
}
