use super::*;

impl SshConnector {
    pub fn new(security_options: ConnectionSecurityOptions, timeout: Duration) -> Self {
        Self {
            security_options,
            timeout,
        }
    }
}

impl Connector for SshConnector {
    type Session = SshSession;

    async fn connect(&self, device: &DeviceDescriptor) -> Result<SshSession, ConnectError> {
        SshSession::connect(device, &self.security_options, self.timeout).await
    }
}

impl DeviceSession for SshSession {
    async fn send_command(&mut self, command: &str) -> Result<String, ConnectError> {
        self.shell.execute(command, self.exec_mode, self.timeout).await
    }

    async fn disconnect(&mut self) -> Result<(), ConnectError> {
        self.close().await
    }
}

impl SshSession {
    /// Opens a shell on `device` and waits for its first prompt.
    ///
    /// The platform template for the descriptor's device type drives prompt
    /// detection. Paging is turned off before the session is returned. Any
    /// failure after the SSH handshake disconnects the client before the
    /// error is returned.
    pub async fn connect(
        device: &DeviceDescriptor,
        security_options: &ConnectionSecurityOptions,
        timeout: Duration,
    ) -> Result<SshSession, ConnectError> {
        let device_addr = format!("{}@{}:{}", device.username, device.host, device.port);
        let profile = templates::for_device_type(&device.device_type)?;

        let config = Config {
            preferred: security_options.preferred(),
            inactivity_timeout: Some(timeout),
            ..Default::default()
        };

        let client = tokio::time::timeout(
            timeout,
            Client::connect_with_config(
                (device.host.clone(), device.port),
                &device.username,
                AuthMethod::with_password(&device.password),
                security_options.server_check.clone(),
                config,
            ),
        )
        .await
        .map_err(|_| ConnectError::InitTimeout(format!("connecting to {device_addr}")))??;
        debug!("{} TCP connection successful", device_addr);

        let opened = open_shell(&client, device, profile.handler, device_addr, timeout).await;
        let shell = match opened {
            Ok(shell) => shell,
            Err(err) => {
                if let Err(e) = client.disconnect().await {
                    debug!("Failed to disconnect after setup error: {:?}", e);
                }
                return Err(err);
            }
        };

        let mut session = Self {
            client,
            shell,
            exec_mode: profile.exec_mode,
            timeout,
        };

        for command in profile.prepare {
            match session.write(command).await {
                Ok(output) if output.success => {}
                Ok(output) => debug!(
                    "{} preparation command '{}' rejected: {}",
                    session.shell.device_addr(),
                    command,
                    output.content
                ),
                Err(err) => {
                    let _ = session.close().await;
                    return Err(err);
                }
            }
        }

        Ok(session)
    }

    /// Checks if the underlying SSH connection is still active.
    pub fn is_connected(&self) -> bool {
        !self.client.is_closed()
    }

    /// Executes a command in the current mode with the session timeout.
    pub async fn write(&mut self, command: &str) -> Result<Output, ConnectError> {
        self.shell.write_with_timeout(command, self.timeout).await
    }

    /// Logs out and closes the SSH connection.
    pub async fn close(&mut self) -> Result<(), ConnectError> {
        debug!("{} Safely closing SSH connection...", self.shell.device_addr());

        if self.is_connected() {
            self.shell.hang_up().await;
            // Give the device a moment to process the logout
            tokio::time::sleep(Duration::from_millis(100)).await;
            self.client.disconnect().await?;
        }

        debug!("{} SSH connection safely closed", self.shell.device_addr());
        Ok(())
    }
}

/// Requests a PTY shell, starts its I/O task and waits for the first prompt.
///
/// On error the returned shell is dropped, which stops the I/O task and
/// releases the channel.
async fn open_shell(
    client: &Client,
    device: &DeviceDescriptor,
    mut handler: DeviceHandler,
    device_addr: String,
    timeout: Duration,
) -> Result<Shell, ConnectError> {
    let mut channel = client.get_channel().await?;
    channel
        .request_pty(false, "xterm", 800, 600, 0, 0, &[])
        .await?;
    channel.request_shell(false).await?;
    debug!("{} Shell request successful", device_addr);

    let (sender_to_shell, mut receiver_from_user) = mpsc::channel::<String>(256);
    let (sender_to_user, receiver_from_shell) = mpsc::channel::<String>(256);

    let io_task_device_addr = device_addr.clone();
    let io_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(data) = receiver_from_user.recv() => {
                    if let Err(e) = channel.data(data.as_bytes()).await {
                        debug!("{} Failed to send data to shell: {:?}", io_task_device_addr, e);
                        break;
                    }
                },
                Some(msg) = channel.wait() => {
                    match msg {
                        ChannelMsg::Data { ref data } => {
                            let text = String::from_utf8_lossy(data).into_owned();
                            if sender_to_user.send(text).await.is_err() {
                                debug!("{} Shell output receiver dropped. Closing task.", io_task_device_addr);
                                break;
                            }
                        }
                        ChannelMsg::ExitStatus { exit_status } => {
                            debug!("{} Shell exited with status code: {}", io_task_device_addr, exit_status);
                            let _ = channel.eof().await;
                            break;
                        }
                        ChannelMsg::Eof => {
                            debug!("{} Shell sent EOF.", io_task_device_addr);
                            break;
                        }
                        _ => {}
                    }
                }
                else => break,
            }
        }
        debug!("{} SSH I/O task ended.", io_task_device_addr);
    });

    // Devices without an enable secret get an empty answer, which they reject.
    let mut params = HashMap::new();
    params.insert(
        templates::ENABLE_PASSWORD_PARAM.to_string(),
        format!("{}\n", device.secret.as_deref().unwrap_or_default()),
    );
    handler.dyn_param = params;

    let mut shell = Shell::new(
        sender_to_shell,
        receiver_from_shell,
        handler,
        device_addr,
        io_task,
    );
    shell.wait_for_prompt(timeout).await?;
    Ok(shell)
}

/// Removes the echoed command and the trailing prompt line from raw output.
///
/// Line endings are normalized to `\n`.
pub fn strip_echo_and_prompt(command: &str, all: &str) -> String {
    let mut content = all;

    if !command.is_empty() && content.starts_with(command) {
        content = content
            .strip_prefix(command)
            .unwrap_or(content)
            .trim_start_matches(['\n', '\r']);
    }

    // Whatever follows the last newline is the prompt.
    let content = match content.rfind('\n') {
        Some(pos) => &content[..pos],
        None => "",
    };

    content.replace("\r\n", "\n").trim_end_matches('\r').to_string()
}
