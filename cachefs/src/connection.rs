//! Connection manager (C2): owns one SFTP session per FUSE worker thread
//! and falls back to an offline capability when a session can't be
//! established or has dropped.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::thread::ThreadId;

use cachefs_ssh::{LocalSshAuthHandler, OfflineCapability, SftpCapability, Ssh, SshOpts};
use log::{error, info, warn};

/// Everything needed to (re)establish a session, resolved once at startup.
#[derive(Clone, Debug)]
pub struct RemoteConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub remote_dir: String,
    pub identity_files: Vec<PathBuf>,
}

/// Keyed by the native thread id because `fuser` dispatches each request on
/// one of a pool of OS threads and exposes no other per-worker identity to
/// the `Filesystem` trait.
pub struct ConnectionManager {
    config: RemoteConfig,
    sessions: Mutex<HashMap<ThreadId, std::sync::Arc<dyn SftpCapability>>>,
}

impl ConnectionManager {
    pub fn new(config: RemoteConfig) -> Self {
        Self {
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Returns this worker's session, connecting if one doesn't exist yet.
    /// A connection failure degrades to [`OfflineCapability`] rather than
    /// propagating, matching the "every call still returns, just fails
    /// with ENETDOWN" contract of the capability the original stubbed out.
    pub async fn acquire(&self) -> std::sync::Arc<dyn SftpCapability> {
        let worker = std::thread::current().id();

        if let Some(session) = self.sessions.lock().unwrap().get(&worker).cloned() {
            return session;
        }

        let session = self.connect().await;
        self.sessions.lock().unwrap().insert(worker, session.clone());
        session
    }

    /// Drops every session this worker is tracking, closing their
    /// underlying SSH connections.
    pub fn close_all(&self) {
        self.sessions.lock().unwrap().clear();
    }

    async fn connect(&self) -> std::sync::Arc<dyn SftpCapability> {
        let opts = SshOpts {
            host: self.config.host.clone(),
            port: self.config.port,
            user: self.config.user.clone(),
            identity_files: self.config.identity_files.clone(),
        };

        let mut ssh = match Ssh::connect(&opts).await {
            Ok(ssh) => ssh,
            Err(e) => {
                warn!("connect to {}:{} failed: {e}", opts.host, opts.port);
                return std::sync::Arc::new(OfflineCapability);
            }
        };

        if let Err(e) = ssh
            .authenticate(&opts.identity_files, &LocalSshAuthHandler)
            .await
        {
            error!("authentication to {} failed: {e}", opts.host);
            return std::sync::Arc::new(OfflineCapability);
        }

        match ssh.into_sftp(&self.config.remote_dir).await {
            Ok(sftp) => {
                info!("sftp session established to {}", opts.host);
                std::sync::Arc::new(sftp)
            }
            Err(e) => {
                warn!("sftp subsystem failed on {}: {e}", opts.host);
                std::sync::Arc::new(OfflineCapability)
            }
        }
    }
}
