//! SSH sessions to network devices.
//!
//! A session is opened per device, used for one command and closed again.
//! [`Connector`] and [`DeviceSession`] are the seam the report driver works
//! against; [`SshConnector`] and [`SshSession`] implement them over SSH.
//!
//! # Main Components
//!
//! - [`SshConnector`] - Opens sessions with a fixed security profile and timeout
//! - [`SshSession`] - Interactive shell with prompt tracking
//! - [`Output`] - Command execution results

use async_ssh2_tokio::client::{AuthMethod, Client};
use async_ssh2_tokio::{Config, ServerCheckMethod};
use log::{debug, trace};
use russh::{ChannelMsg, Preferred};
use std::borrow::Cow;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::task::JoinHandle;

use crate::config;
use crate::device::{DeviceHandler, IGNORE_START_LINE};
use crate::error::ConnectError;
use crate::inventory::DeviceDescriptor;
use crate::templates;

pub use client::strip_echo_and_prompt;
pub use security::{ConnectionSecurityOptions, SecurityLevel};
use shell::Shell;

/// An open session able to run CLI commands on one device.
#[allow(async_fn_in_trait)]
pub trait DeviceSession {
    /// Runs `command` and returns the device's raw text response.
    async fn send_command(&mut self, command: &str) -> Result<String, ConnectError>;

    /// Closes the session. Called exactly once per opened session.
    async fn disconnect(&mut self) -> Result<(), ConnectError>;
}

/// Opens sessions from device descriptors.
#[allow(async_fn_in_trait)]
pub trait Connector {
    type Session: DeviceSession;

    async fn connect(&self, device: &DeviceDescriptor) -> Result<Self::Session, ConnectError>;
}

/// Interactive SSH shell on one device, tracked by a prompt state machine.
pub struct SshSession {
    client: Client,
    shell: Shell,
    /// Mode commands from [`DeviceSession::send_command`] run in.
    exec_mode: &'static str,
    timeout: Duration,
}

/// The output result of a command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    /// False if the device printed one of its error patterns.
    pub success: bool,
    /// Response without the echoed command and trailing prompt.
    pub content: String,
    /// Everything received, including mode transitions.
    pub all: String,
}

/// Opens [`SshSession`]s with one security profile and timeout.
#[derive(Debug, Clone)]
pub struct SshConnector {
    security_options: ConnectionSecurityOptions,
    timeout: Duration,
}

mod client;
mod security;
mod shell;
