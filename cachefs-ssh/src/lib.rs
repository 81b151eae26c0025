//! SSH transport, authentication, and the SFTP capability interface used by
//! cachefs's connection manager.
//!
//! This crate owns the only code in the workspace that talks to the network.
//! Everything it exposes is expressed against [`SftpCapability`], a trait
//! object the rest of cachefs programs against; a live session
//! ([`LiveSftp`]) and an offline stub ([`OfflineCapability`]) are the two
//! implementors.

use std::io::{self, Write};
use std::sync::Arc;

use async_trait::async_trait;
use log::*;
use russh::client::{self, Handle};
use russh::keys::PrivateKey;
use tokio::io::AsyncRead;

mod capability;
mod live;
mod offline;

pub use capability::{RemoteAttrs, SftpCapability};
pub use live::LiveSftp;
pub use offline::OfflineCapability;

/// Options needed to open an SSH connection.
#[derive(Clone, Debug)]
pub struct SshOpts {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub identity_files: Vec<std::path::PathBuf>,
}

/// Represents a single authentication prompt for the user.
#[derive(Debug)]
pub struct SshAuthPrompt {
    pub prompt: String,
    pub echo: bool,
}

/// A series of prompts the caller must answer in order to authenticate.
#[derive(Debug)]
pub struct SshAuthEvent {
    pub username: String,
    pub prompts: Vec<SshAuthPrompt>,
}

/// Handles interactive authentication prompts.
#[async_trait]
pub trait SshAuthHandler: Send + Sync {
    async fn on_authenticate(&self, event: SshAuthEvent) -> io::Result<Vec<String>>;
}

/// Prompts on the controlling terminal, echoing non-password answers.
pub struct LocalSshAuthHandler;

#[async_trait]
impl SshAuthHandler for LocalSshAuthHandler {
    async fn on_authenticate(&self, event: SshAuthEvent) -> io::Result<Vec<String>> {
        let task = tokio::task::spawn_blocking(move || {
            let mut answers = Vec::new();
            for prompt in &event.prompts {
                let answer = if prompt.echo {
                    eprint!("{}", prompt.prompt);
                    io::stderr().lock().flush()?;
                    let mut answer = String::new();
                    io::stdin().read_line(&mut answer)?;
                    answer.trim_end().to_string()
                } else {
                    rpassword::prompt_password(&prompt.prompt)?
                };
                answers.push(answer);
            }
            Ok(answers)
        });
        task.await.map_err(io::Error::other)?
    }
}

/// Accepts any host key unconditionally. No known_hosts file is consulted;
/// TOFU/pinning is left to the network layer surrounding the mount.
struct ClientHandler;

#[async_trait]
impl client::Handler for ClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &russh::keys::PublicKey,
    ) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

/// A live, authenticated SSH connection. Converting it into an
/// [`SftpCapability`] via [`Ssh::into_sftp`] opens the SFTP subsystem.
pub struct Ssh {
    handle: Handle<ClientHandler>,
    user: String,
    authenticated: bool,
}

impl Ssh {
    /// Connects (but does not authenticate) to `opts.host:opts.port`.
    pub async fn connect(opts: &SshOpts) -> io::Result<Self> {
        let mut config = russh::client::Config::default();
        // Spec requires a 1 GiB transport window so a 128 KiB block burst
        // fetch never stalls on flow control.
        config.window_size = 1024 * 1024 * 1024;
        let handler = ClientHandler;

        info!("connecting to {}:{}", opts.host, opts.port);
        let handle = russh::client::connect(
            Arc::new(config),
            (opts.host.as_str(), opts.port),
            handler,
        )
        .await
        .map_err(|e| {
            io::Error::new(
                io::ErrorKind::ConnectionRefused,
                format!("ssh connect to {}:{} failed: {e}", opts.host, opts.port),
            )
        })?;

        Ok(Self {
            handle,
            user: opts.user.clone(),
            authenticated: false,
        })
    }

    #[inline]
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Authenticates: tries each configured identity file first, then falls
    /// back to a single interactive password prompt. A failed password
    /// attempt is reported to the caller as an error; whether to retry or
    /// exit the process is a decision for the CLI, not this library.
    pub async fn authenticate(
        &mut self,
        identity_files: &[std::path::PathBuf],
        handler: &dyn SshAuthHandler,
    ) -> io::Result<()> {
        if self.authenticated {
            return Ok(());
        }

        for key_file in identity_files {
            match self.load_private_key(key_file).await {
                Ok(key) => {
                    let key_with_hash = russh::keys::PrivateKeyWithHashAlg::new(Arc::new(key), None);
                    let result = self
                        .handle
                        .authenticate_publickey(&self.user, key_with_hash)
                        .await
                        .map_err(|e| io::Error::new(io::ErrorKind::PermissionDenied, e))?;
                    if result.success() {
                        self.authenticated = true;
                        return Ok(());
                    }
                }
                Err(e) => warn!("failed to load identity file {key_file:?}: {e}"),
            }
        }

        let event = SshAuthEvent {
            username: self.user.clone(),
            prompts: vec![SshAuthPrompt {
                prompt: format!("{}'s password: ", self.user),
                echo: false,
            }],
        };
        let mut answers = handler.on_authenticate(event).await?;
        let password = answers
            .pop()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "no password provided"))?;

        let result = self
            .handle
            .authenticate_password(&self.user, &password)
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::PermissionDenied, e))?;

        if result.success() {
            self.authenticated = true;
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "authentication failed",
            ))
        }
    }

    async fn load_private_key(&self, path: &std::path::Path) -> io::Result<PrivateKey> {
        let contents = tokio::fs::read_to_string(path).await?;
        russh::keys::decode_secret_key(&contents, None)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Opens the `sftp` subsystem and changes into `basedir`, producing the
    /// capability object the rest of cachefs uses for every remote
    /// operation. A failure to `chdir` means `basedir` doesn't exist or
    /// isn't reachable and should be treated as a fatal configuration error.
    pub async fn into_sftp(self, basedir: &str) -> io::Result<LiveSftp> {
        let channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(io::Error::other)?;
        channel
            .request_subsystem(true, "sftp")
            .await
            .map_err(io::Error::other)?;

        let sftp = russh_sftp::client::SftpSession::new(channel.into_stream())
            .await
            .map_err(io::Error::other)?;

        let sftp = LiveSftp::new(self.handle, sftp);
        sftp.chdir(basedir).await?;
        Ok(sftp)
    }
}

/// Re-exported for callers that need to read a block range out of a
/// capability-returned reader without pulling in tokio themselves.
pub async fn read_up_to(
    mut reader: Box<dyn AsyncRead + Unpin + Send>,
    max_bytes: usize,
) -> io::Result<Vec<u8>> {
    use tokio::io::AsyncReadExt;
    let mut buf = vec![0u8; max_bytes];
    let mut total = 0;
    loop {
        if total == max_bytes {
            break;
        }
        let n = reader.read(&mut buf[total..]).await?;
        if n == 0 {
            break;
        }
        total += n;
    }
    buf.truncate(total);
    Ok(buf)
}
