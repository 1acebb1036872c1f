//! Error types for device connection, command dispatch and config retrieval.
//!
//! Every failure the driver can hit on a single device is a [`ConnectError`];
//! none of them is fatal to a run.

use thiserror::Error;
use tokio::sync::mpsc::error::SendError;

/// Errors that can occur while talking to one network device.
#[derive(Error, Debug)]
pub enum ConnectError {
    /// The target mode cannot be reached from the current prompt state.
    #[error("unreachable state {0}")]
    UnreachableState(String),

    /// The SSH channel was closed while waiting for a prompt.
    #[error("channel disconnect on wait prompt")]
    ChannelDisconnectError,

    /// No prompt was recognized before the timeout expired.
    ///
    /// Carries whatever the device printed up to that point.
    #[error("timed out {0}")]
    InitTimeout(String),

    /// Command execution timed out.
    ///
    /// The error contains the partial output received before the timeout.
    #[error("exec command timeout: {0}")]
    ExecTimeout(String),

    /// The device answered the command with one of its error patterns.
    #[error("command '{command}' rejected by device: {output}")]
    CommandRejected { command: String, output: String },

    /// No configuration command is defined for this device type.
    #[error("unsupported device type {0}")]
    UnsupportedDeviceType(String),

    /// A prompt template contained an invalid regex.
    #[error("invalid device handler config: {0}")]
    InvalidDeviceHandlerConfig(String),

    /// An environment setting could not be parsed.
    #[error("invalid value '{value}' for {key}")]
    InvalidSetting { key: String, value: String },

    #[error("internal error: {0}")]
    InternalServerError(String),

    /// An error occurred in the async-ssh2-tokio library.
    #[error("async ssh2 error: {0}")]
    Ssh2Error(#[from] async_ssh2_tokio::Error),

    /// An error occurred in the russh library.
    #[error("russh error: {0}")]
    RusshError(#[from] russh::Error),

    /// Failed to send data through the channel.
    #[error("Failed to send data: {0}")]
    SendDataError(#[from] SendError<String>),
}
