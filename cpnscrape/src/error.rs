//! Error types for cpnscrape.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Main error type for cpnscrape operations.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Channel operation errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Driver-level errors
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// Platform/vendor errors
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    /// Device output could not be reduced to records
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Inventory loading or validation errors
    #[error("Inventory error: {0}")]
    Inventory(#[from] InventoryError),

    /// Table export errors
    #[error("Export error: {0}")]
    Export(#[from] ExportError),
}

/// Transport layer errors (SSH connection, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// SSH key error
    #[error("SSH key error: {0}")]
    Key(String),

    /// The host presented a key that differs from the known_hosts entry
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// Strict verification is on and the host is not in known_hosts
    #[error("Host key for {host}:{port} is not in known_hosts")]
    HostKeyUnknown { host: String, port: u16 },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// Channel layer errors (prompt matching, PTY operations).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Prompt pattern was not seen within the timeout
    #[error("Pattern not found within {0:?}")]
    PatternTimeout(std::time::Duration),

    /// Channel closed unexpectedly
    #[error("Channel closed")]
    Closed,

    /// SSH protocol error on the channel
    #[error("Channel SSH error: {0}")]
    Ssh(russh::Error),
}

/// Driver layer errors (command execution).
#[derive(Error, Debug)]
pub enum DriverError {
    /// Driver not connected
    #[error("Driver not connected - call open() first")]
    NotConnected,

    /// Driver already connected
    #[error("Driver already connected")]
    AlreadyConnected,

    /// The device reported a failure for a command
    #[error("Command '{command}' failed: {message}")]
    CommandFailed { command: String, message: String },

    /// Invalid configuration in the driver builder
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// Platform/vendor definition errors.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// No built-in platform has this name
    #[error("Unknown platform '{name}'")]
    UnknownPlatform { name: String },

    /// A prompt pattern failed to compile
    #[error("Invalid prompt pattern: {0}")]
    InvalidPrompt(#[from] regex::Error),
}

/// Errors raised while turning device output into records.
///
/// Malformed lines and non-matching rows are skipped, not reported; only
/// inconsistencies that invalidate a whole node's result end up here.
#[derive(Error, Debug)]
pub enum ParseError {
    /// An extracted timestamp is not a real date in the reference year
    #[error("Node '{node}': timestamp '{timestamp}' is not a valid date in {year}")]
    Timestamp {
        node: String,
        timestamp: String,
        year: i32,
    },

    /// Date or time given for a log window is malformed
    #[error("Invalid {field} '{value}'")]
    Window { field: &'static str, value: String },

    /// Log window ends before it starts
    #[error("Log window ends ({end}) before it starts ({start})")]
    EmptyWindow { start: String, end: String },
}

/// Inventory file errors.
#[derive(Error, Debug)]
pub enum InventoryError {
    /// The inventory file could not be read
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The inventory is not valid TOML for the expected layout
    #[error("Malformed inventory: {0}")]
    Toml(#[from] toml::de::Error),

    /// The inventory lists no nodes
    #[error("Inventory contains no nodes")]
    Empty,

    /// Two nodes share a name
    #[error("Duplicate node name '{name}'")]
    DuplicateNode { name: String },
}

/// Table export errors.
#[derive(Error, Debug)]
pub enum ExportError {
    /// I/O error writing the table
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Unrecognized output format name or file extension
    #[error("Unsupported output format '{0}'")]
    UnsupportedFormat(String),
}

/// Result type alias using cpnscrape's Error.
pub type Result<T> = std::result::Result<T, Error>;
