//! Entry point: parses arguments, resolves the on-disk cache layout,
//! performs a blocking preflight connection so startup failures that must
//! be fatal (bad credentials, a missing remote directory) are reported
//! before the mount call ever runs, then hands off to `fuser::mount2`.

mod cli;
mod connection;
mod datacache;
mod error;
mod fs;
mod inode;
mod metacache;
mod pathmap;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use log::{error, info, warn};

use cachefs_ssh::{LocalSshAuthHandler, Ssh, SshOpts};
use cli::Opt;
use connection::{ConnectionManager, RemoteConfig};
use datacache::DataCache;
use error::{CliError, CliResult};
use fs::{CacheFs, MountContext};
use metacache::MetadataCache;

/// Cache root layout (spec §6), kept exactly as named there: the data root
/// lives under `~/.cachefs/data/<host>/<basedir>/` while the metadata root
/// lives under `~/.sshfs-offline/metadata/<host>/<basedir>/` — two
/// different top-level directories, a leftover of the tool's naming history
/// that the spec's on-disk layout preserves verbatim rather than unifying.
fn cache_roots(host: &str, remote_dir: &str) -> CliResult<(PathBuf, PathBuf)> {
    let home = dirs::home_dir().ok_or_else(|| {
        CliError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "could not resolve the current user's home directory",
        ))
    })?;
    let basedir = remote_dir.trim_start_matches('/');
    let data_root = home.join(".cachefs").join("data").join(host).join(basedir);
    let metadata_root = home
        .join(".sshfs-offline")
        .join("metadata")
        .join(host)
        .join(basedir);
    Ok((data_root, metadata_root))
}

fn default_identity_files() -> Vec<PathBuf> {
    let Some(home) = dirs::home_dir() else {
        return Vec::new();
    };
    let ssh_dir = home.join(".ssh");
    ["id_ed25519", "id_ecdsa", "id_rsa"]
        .into_iter()
        .map(|name| ssh_dir.join(name))
        .filter(|p| p.exists())
        .collect()
}

/// Connects, authenticates, and opens the SFTP subsystem once up front
/// (outside the per-worker [`ConnectionManager`]) so the three ways startup
/// can fail are told apart:
///
/// - name resolution / TCP connect failure: logged, mount proceeds offline
///   (the remote may come back; I6 keeps serving cached answers meanwhile).
/// - authentication failure: fatal, matches the original tool's behavior of
///   refusing to mount against credentials it knows are wrong.
/// - the remote directory doesn't exist or isn't a directory: fatal, since
///   there is nothing coherent to mount.
///
/// Returns `Ok(remote_dir)` (resolved to the server's home directory when
/// none was requested) on success; on a transient connect failure it
/// returns the configured default remote directory and the mount proceeds
/// with every session starting offline.
async fn preflight(opt: &Opt, host: String, user: String) -> CliResult<String> {
    let opts = SshOpts {
        host: host.clone(),
        port: opt.port,
        user: user.clone(),
        identity_files: default_identity_files(),
    };

    let mut ssh = match Ssh::connect(&opts).await {
        Ok(ssh) => ssh,
        Err(e) => {
            warn!("could not reach {host}:{} ({e}); mounting offline", opt.port);
            return Ok(opt.resolved_remote_dir().unwrap_or_else(|| ".".to_string()));
        }
    };

    ssh.authenticate(&opts.identity_files, &LocalSshAuthHandler)
        .await
        .map_err(|_| CliError::AuthenticationFailed {
            host: host.clone(),
            user: user.clone(),
        })?;

    let remote_dir = opt.resolved_remote_dir().unwrap_or_else(|| ".".to_string());
    ssh.into_sftp(&remote_dir)
        .await
        .map_err(|_| CliError::NoRemoteDirectory)?;

    Ok(remote_dir)
}

fn run(opt: Opt) -> CliResult<()> {
    if !opt.mountpoint.is_dir() {
        return Err(CliError::InvalidMountpoint(opt.mountpoint.clone()));
    }

    let runtime = tokio::runtime::Runtime::new().map_err(CliError::Io)?;
    let user = opt.resolved_user();
    let remote_dir = runtime.block_on(preflight(&opt, opt.host.clone(), user.clone()))?;

    let (data_dir, metadata_dir) = cache_roots(&opt.host, &remote_dir)?;
    std::fs::create_dir_all(&data_dir).map_err(CliError::Io)?;
    std::fs::create_dir_all(&metadata_dir).map_err(CliError::Io)?;

    let config = RemoteConfig {
        host: opt.host.clone(),
        port: opt.port,
        user,
        remote_dir: remote_dir.clone(),
        identity_files: default_identity_files(),
    };

    let ctx = Arc::new(MountContext {
        connection: ConnectionManager::new(config),
        metadata: MetadataCache::new(metadata_dir, Duration::from_secs(opt.cachetimeout)),
        data: DataCache::new(data_dir),
        remote_dir,
    });

    let cachefs = CacheFs::new(ctx, runtime.handle().clone());

    let options = vec![
        fuser::MountOption::FSName("cachefs".to_string()),
        fuser::MountOption::DefaultPermissions,
    ];

    info!("mounting {} at {:?}", opt.host, opt.mountpoint);
    fuser::mount2(cachefs, &opt.mountpoint, &options).map_err(CliError::Io)
}

fn main() {
    let opt = Opt::parse();
    if let Err(e) = opt.init_logger() {
        eprintln!("failed to initialize logging: {e}");
    }

    match run(opt) {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            error!("{e} (exit class: {:?})", e.exit_class());
            std::process::exit(e.process_exit_code());
        }
    }
}
