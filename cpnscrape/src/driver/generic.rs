//! Generic driver implementation that works with any platform.

use std::time::{Duration, Instant};

use log::{debug, warn};
use regex::bytes::Regex;

use super::Driver;
use super::response::Response;
use crate::channel::PtyChannel;
use crate::error::{DriverError, PlatformError, Result};
use crate::platform::PlatformDefinition;
use crate::transport::{SshConfig, SshTransport};

/// Trailing bytes searched for a prompt.
const SEARCH_DEPTH: usize = 1000;

/// Driver for any [`PlatformDefinition`].
///
/// Owns the SSH session and one interactive shell channel. Commands are
/// written to the shell and output is collected until one of the
/// platform's prompts reappears.
pub struct GenericDriver {
    ssh_config: SshConfig,
    platform: PlatformDefinition,
    transport: Option<SshTransport>,
    channel: Option<PtyChannel>,
    /// Combined prompt pattern for all prompt levels.
    prompt_pattern: Regex,
    timeout: Duration,
}

impl GenericDriver {
    /// Create a new generic driver. Does not connect.
    pub fn new(ssh_config: SshConfig, platform: PlatformDefinition) -> Result<Self> {
        let prompt_pattern = platform
            .prompt_pattern()
            .map_err(PlatformError::InvalidPrompt)?;

        Ok(Self {
            timeout: ssh_config.timeout,
            ssh_config,
            platform,
            transport: None,
            channel: None,
            prompt_pattern,
        })
    }

    /// Get a reference to the platform definition.
    pub fn platform(&self) -> &PlatformDefinition {
        &self.platform
    }

    /// Host this driver connects to.
    pub fn host(&self) -> &str {
        &self.ssh_config.host
    }

    /// Open the shell, wait for the first prompt and run the platform's
    /// on-open commands.
    async fn start_session(&mut self) -> Result<()> {
        let transport = self.transport.as_ref().ok_or(DriverError::NotConnected)?;
        let mut channel = PtyChannel::new(transport.open_channel().await?, SEARCH_DEPTH);

        let banner = channel
            .read_until_prompt(&self.prompt_pattern, self.timeout)
            .await?;
        debug!(
            "{}: session open at prompt {:?}",
            self.ssh_config.host,
            self.trailing_prompt(&banner)
        );
        self.channel = Some(channel);

        for command in self.platform.on_open_commands.clone() {
            let response = self.send_command(&command).await?;
            if let Some(failure) = response.failure_message {
                warn!("{}: '{}' rejected: {}", self.ssh_config.host, command, failure);
            }
        }

        Ok(())
    }

    /// The last prompt in `data`, trimmed.
    fn trailing_prompt(&self, data: &[u8]) -> String {
        self.prompt_pattern
            .find_iter(data)
            .last()
            .map(|m| String::from_utf8_lossy(m.as_bytes()).trim().to_string())
            .unwrap_or_default()
    }
}

impl Driver for GenericDriver {
    async fn open(&mut self) -> Result<()> {
        if self.transport.is_some() {
            return Err(DriverError::AlreadyConnected.into());
        }

        self.transport = Some(SshTransport::connect(self.ssh_config.clone()).await?);

        let started = self.start_session().await;
        if started.is_err() {
            if let Err(e) = self.close().await {
                debug!("{}: close after failed open: {}", self.ssh_config.host, e);
            }
        }
        started
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(channel) = self.channel.take() {
            if let Err(e) = channel.close().await {
                debug!("{}: channel close failed: {}", self.ssh_config.host, e);
            }
        }
        if let Some(transport) = self.transport.take() {
            transport.close().await?;
        }
        Ok(())
    }

    async fn send_command(&mut self, command: &str) -> Result<Response> {
        let channel = self.channel.as_mut().ok_or(DriverError::NotConnected)?;

        let start = Instant::now();
        channel.send(command).await?;
        let data = channel
            .read_until_prompt(&self.prompt_pattern, self.timeout)
            .await?;
        let elapsed = start.elapsed();

        let raw_result = String::from_utf8_lossy(&data).into_owned();
        let prompt = self.trailing_prompt(&data);
        let result = self.platform.normalize_output(&raw_result, command);

        debug!(
            "{}: '{}' returned {} bytes in {:?}",
            self.ssh_config.host,
            command,
            result.len(),
            elapsed
        );

        let failure = self.platform.detect_failure(&result).map(str::to_string);
        let response = Response::new(command, result, raw_result, prompt, elapsed);

        Ok(match failure {
            Some(message) => response.with_failure(message),
            None => response,
        })
    }

    /// Opened and the SSH session has not dropped since.
    fn is_open(&self) -> bool {
        self.transport.as_ref().is_some_and(|t| !t.is_closed())
    }
}
