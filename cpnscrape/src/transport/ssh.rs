//! SSH transport implementation using russh.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use log::{debug, warn};
use russh::Channel;
use russh::client::{self, Handle, Msg};
use russh::keys::{PrivateKeyWithHashAlg, PublicKey, load_secret_key};
use secrecy::ExposeSecret;

use super::config::{AuthMethod, HostKeyVerification, SshConfig};
use crate::error::{Result, TransportError};

/// An authenticated SSH session to one device.
pub struct SshTransport {
    session: Handle<HostKeyCheck>,
    config: SshConfig,
}

impl SshTransport {
    /// Connect to the device and authenticate.
    pub async fn connect(config: SshConfig) -> Result<Self> {
        let client_config = Arc::new(client::Config {
            inactivity_timeout: Some(config.timeout),
            ..Default::default()
        });

        let rejection = Arc::new(Mutex::new(None));
        let handler = HostKeyCheck {
            host: config.host.clone(),
            port: config.port,
            mode: config.host_key_verification,
            known_hosts_path: config.known_hosts_path.clone(),
            rejection: rejection.clone(),
        };

        debug!("connecting to {}", config.socket_addr());

        let addr = (config.host.as_str(), config.port);
        let connecting = client::connect(client_config, addr, handler);
        let mut session = tokio::time::timeout(config.timeout, connecting)
            .await
            .map_err(|_| TransportError::Timeout(config.timeout))?
            .map_err(|e| {
                // A rejected host key surfaces from russh as a bare UnknownKey;
                // report why it was rejected instead.
                rejection
                    .lock()
                    .ok()
                    .and_then(|mut slot| slot.take())
                    .unwrap_or(TransportError::Ssh(e))
            })?;

        Self::authenticate(&mut session, &config).await?;

        Ok(Self { session, config })
    }

    /// Open a session channel with a PTY and an interactive shell.
    pub async fn open_channel(&self) -> Result<Channel<Msg>> {
        let channel = self
            .session
            .channel_open_session()
            .await
            .map_err(TransportError::Ssh)?;

        channel
            .request_pty(
                true,
                "xterm",
                self.config.terminal_width,
                self.config.terminal_height,
                0,
                0,
                &[],
            )
            .await
            .map_err(TransportError::Ssh)?;

        channel
            .request_shell(true)
            .await
            .map_err(TransportError::Ssh)?;

        Ok(channel)
    }

    async fn authenticate(session: &mut Handle<HostKeyCheck>, config: &SshConfig) -> Result<()> {
        let user = config.username.as_str();

        let accepted = match &config.auth {
            AuthMethod::None => session
                .authenticate_none(user)
                .await
                .map_err(TransportError::Ssh)?
                .success(),
            AuthMethod::Password(password) => session
                .authenticate_password(user, password.expose_secret())
                .await
                .map_err(TransportError::Ssh)?
                .success(),
            AuthMethod::PrivateKey { path, passphrase } => {
                let key = load_secret_key(path, passphrase.as_ref().map(|p| p.expose_secret()))
                    .map_err(|e| TransportError::Key(e.to_string()))?;

                let hash_alg = session
                    .best_supported_rsa_hash()
                    .await
                    .map_err(TransportError::Ssh)?
                    .flatten();

                let key = PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg);
                session
                    .authenticate_publickey(user, key)
                    .await
                    .map_err(TransportError::Ssh)?
                    .success()
            }
        };

        if !accepted {
            return Err(TransportError::AuthenticationFailed {
                user: user.to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// Whether the session's background task has stopped.
    pub fn is_closed(&self) -> bool {
        self.session.is_closed()
    }

    /// Disconnect from the device.
    pub async fn close(self) -> Result<()> {
        self.session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
            .map_err(TransportError::Ssh)?;
        Ok(())
    }
}

/// russh client handler that verifies the server key against known_hosts.
struct HostKeyCheck {
    host: String,
    port: u16,
    mode: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    /// Why the key was rejected, picked up by `connect`.
    rejection: Arc<Mutex<Option<TransportError>>>,
}

impl HostKeyCheck {
    /// `Ok(true)` if known, `Ok(false)` if the host has no entry.
    fn is_known(&self, key: &PublicKey) -> std::result::Result<bool, TransportError> {
        let lookup = match &self.known_hosts_path {
            Some(path) => russh::keys::check_known_hosts_path(&self.host, self.port, key, path),
            None => russh::keys::check_known_hosts(&self.host, self.port, key),
        };

        match lookup {
            Ok(known) => Ok(known),
            Err(russh::keys::Error::KeyChanged { line }) => Err(TransportError::HostKeyChanged {
                host: self.host.clone(),
                port: self.port,
                line,
            }),
            Err(e) => Err(TransportError::KnownHosts(e.to_string())),
        }
    }

    fn learn(&self, key: &PublicKey) -> std::result::Result<(), TransportError> {
        let saved = match &self.known_hosts_path {
            Some(path) => {
                russh::keys::known_hosts::learn_known_hosts_path(&self.host, self.port, key, path)
            }
            None => russh::keys::known_hosts::learn_known_hosts(&self.host, self.port, key),
        };
        saved.map_err(|e| TransportError::KnownHosts(e.to_string()))
    }

    fn reject(&self, reason: TransportError) -> bool {
        if let Ok(mut slot) = self.rejection.lock() {
            *slot = Some(reason);
        }
        false
    }

    fn verify(&self, key: &PublicKey) -> bool {
        if self.mode == HostKeyVerification::Disabled {
            return true;
        }

        match self.is_known(key) {
            Ok(true) => true,
            Ok(false) if self.mode == HostKeyVerification::AcceptNew => {
                if let Err(e) = self.learn(key) {
                    warn!("Failed to save host key for {}: {}", self.host, e);
                }
                true
            }
            Ok(false) => self.reject(TransportError::HostKeyUnknown {
                host: self.host.clone(),
                port: self.port,
            }),
            Err(e) => self.reject(e),
        }
    }
}

impl client::Handler for HostKeyCheck {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        Ok(self.verify(server_public_key))
    }
}
