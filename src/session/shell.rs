use super::*;

/// Aborts the shell I/O task when dropped, releasing the SSH channel it owns.
struct IoTask(JoinHandle<()>);

impl Drop for IoTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Line-oriented conversation with a device shell.
///
/// Device output arrives on `recv` in arbitrary chunks; commands and
/// automatic answers (paging, enable password) leave on `sender`.
pub(super) struct Shell {
    sender: Sender<String>,
    recv: Receiver<String>,
    handler: DeviceHandler,
    prompt: String,
    device_addr: String,
    _io_task: IoTask,
}

impl Shell {
    pub(super) fn new(
        sender: Sender<String>,
        recv: Receiver<String>,
        handler: DeviceHandler,
        device_addr: String,
        io_task: JoinHandle<()>,
    ) -> Self {
        Self {
            sender,
            recv,
            handler,
            prompt: String::new(),
            device_addr,
            _io_task: IoTask(io_task),
        }
    }

    pub(super) fn device_addr(&self) -> &str {
        &self.device_addr
    }

    pub(super) fn current_state(&self) -> &str {
        self.handler.current_state()
    }

    /// Reads until the first prompt, answering input requests on the way.
    pub(super) async fn wait_for_prompt(&mut self, timeout: Duration) -> Result<(), ConnectError> {
        let handler = &mut self.handler;
        let recv = &mut self.recv;
        let sender = &self.sender;
        let prompt = &mut self.prompt;

        let mut buffer = String::new();
        let mut initial_output = String::new();

        let result = tokio::time::timeout(timeout, async {
            loop {
                let Some(data) = recv.recv().await else {
                    return Err(ConnectError::ChannelDisconnectError);
                };
                trace!("{:?}", data);
                buffer.push_str(&data);
                initial_output.push_str(&data);

                while let Some(newline_pos) = buffer.find('\n') {
                    let line = buffer.drain(..=newline_pos).collect::<String>();
                    handler.read(line.trim_end());
                }

                if !buffer.is_empty() {
                    if handler.read_prompt(&buffer) {
                        handler.read(&buffer);
                        *prompt = std::mem::take(&mut buffer);
                        return Ok(());
                    }
                    if let Some((c, _)) = handler.read_need_write(&buffer) {
                        handler.read(&buffer);
                        sender.send(c).await?;
                    }
                }
            }
        })
        .await;

        match result {
            Ok(Ok(())) => {
                debug!(
                    "{} initial prompt '{}' in state {}",
                    self.device_addr,
                    self.prompt.trim(),
                    self.handler.current_state()
                );
                Ok(())
            }
            Ok(Err(err)) => Err(err),
            Err(_) => Err(ConnectError::InitTimeout(if initial_output.is_empty() {
                "waiting for initial prompt".to_string()
            } else {
                format!("waiting for initial prompt: {initial_output}")
            })),
        }
    }

    /// Executes a command and waits for the full output by matching the prompt.
    pub(super) async fn write_with_timeout(
        &mut self,
        command: &str,
        timeout: Duration,
    ) -> Result<Output, ConnectError> {
        let handler = &mut self.handler;
        let recv = &mut self.recv;
        let sender = &self.sender;
        let prompt = &mut self.prompt;

        // Drop anything left over from the previous command.
        while recv.try_recv().is_ok() {}

        sender.send(format!("{command}\n")).await?;

        let mut clean_output = String::new();
        let mut line_buffer = String::new();

        let result = tokio::time::timeout(timeout, async {
            let mut is_error = false;
            loop {
                let Some(data) = recv.recv().await else {
                    return Err(ConnectError::ChannelDisconnectError);
                };
                line_buffer.push_str(&data);

                while let Some(newline_pos) = line_buffer.find('\n') {
                    let line = line_buffer.drain(..=newline_pos).collect::<String>();
                    let trim_start = IGNORE_START_LINE.replace(&line, "");
                    handler.read(trim_start.trim_end());
                    if handler.error() {
                        is_error = true;
                    }
                    clean_output.push_str(&trim_start);
                }

                // A prompt usually arrives without a trailing newline.
                if !line_buffer.is_empty() {
                    if handler.read_prompt(&line_buffer) {
                        handler.read(&line_buffer);
                        clean_output.push_str(&line_buffer);
                        *prompt = std::mem::take(&mut line_buffer);
                        return Ok(!is_error);
                    }
                    if let Some((c, is_record)) = handler.read_need_write(&line_buffer) {
                        handler.read(&line_buffer);
                        if !is_record {
                            line_buffer.clear();
                        }
                        trace!("Input required: '{:?}'", c);
                        sender.send(c).await?;
                    }
                }
            }
        })
        .await;

        let success = match result {
            Err(_) => return Err(ConnectError::ExecTimeout(clean_output)),
            Ok(Err(err)) => return Err(err),
            Ok(Ok(success)) => success,
        };

        Ok(Output {
            success,
            content: strip_echo_and_prompt(command, &clean_output),
            all: clean_output,
        })
    }

    /// Executes a command in a specific device mode.
    ///
    /// Mode transition commands are sent first; if one fails or lands in the
    /// wrong mode, its output is returned with `success` false and the
    /// command itself is not sent.
    pub(super) async fn write_with_mode(
        &mut self,
        command: &str,
        mode: &str,
        timeout: Duration,
    ) -> Result<Output, ConnectError> {
        let trans_cmds = self.handler.trans_state_write(mode)?;
        let mut all = self.prompt.clone();

        for (t_cmd, target_state) in trans_cmds {
            debug!("{} Trans state command: {}", self.device_addr, t_cmd);
            let mut mode_output = self.write_with_timeout(&t_cmd, timeout).await?;
            all.push_str(&mode_output.all);
            if !mode_output.success || self.handler.current_state() != target_state {
                mode_output.success = false;
                mode_output.all = all;
                return Ok(mode_output);
            }
        }

        let mut cmd_output = self.write_with_timeout(command, timeout).await?;
        all.push_str(&cmd_output.all);
        cmd_output.all = all;
        Ok(cmd_output)
    }

    /// Runs `command` in `mode` and returns its text.
    ///
    /// Output the device flags as an error becomes
    /// [`ConnectError::CommandRejected`].
    pub(super) async fn execute(
        &mut self,
        command: &str,
        mode: &str,
        timeout: Duration,
    ) -> Result<String, ConnectError> {
        let output = self.write_with_mode(command, mode, timeout).await?;
        if !output.success {
            return Err(ConnectError::CommandRejected {
                command: command.to_string(),
                output: output.content,
            });
        }
        Ok(output.content)
    }

    /// Stops reading and asks the device to end the shell.
    pub(super) async fn hang_up(&mut self) {
        self.recv.close();
        if let Err(e) = self.sender.send("exit\n".to_string()).await {
            debug!("Failed to send exit command: {:?}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    const TIMEOUT: Duration = Duration::from_secs(5);

    type Inputs = Arc<Mutex<Vec<String>>>;

    /// Shell wired to a scripted device.
    ///
    /// The device prints `greeting`, then answers each expected input with
    /// its reply chunks, in order. Unexpected input gets no answer. Every
    /// input the device receives is recorded.
    fn scripted_shell(
        handler: DeviceHandler,
        greeting: &str,
        script: Vec<(&str, Vec<&str>)>,
    ) -> (Shell, Inputs) {
        let (to_device, mut from_shell) = mpsc::channel::<String>(16);
        let (to_shell, from_device) = mpsc::channel::<String>(16);
        let inputs: Inputs = Arc::default();

        let journal = inputs.clone();
        let greeting = greeting.to_string();
        let mut script: VecDeque<(String, Vec<String>)> = script
            .into_iter()
            .map(|(input, reply)| {
                (
                    input.to_string(),
                    reply.into_iter().map(str::to_string).collect(),
                )
            })
            .collect();

        let device = tokio::spawn(async move {
            if to_shell.send(greeting).await.is_err() {
                return;
            }
            while let Some(input) = from_shell.recv().await {
                journal.lock().expect("journal lock").push(input.clone());
                let expected = script.front().is_some_and(|(next, _)| *next == input);
                if !expected {
                    continue;
                }
                if let Some((_, chunks)) = script.pop_front() {
                    for chunk in chunks {
                        if to_shell.send(chunk).await.is_err() {
                            return;
                        }
                    }
                }
            }
        });

        let shell = Shell::new(
            to_device,
            from_device,
            handler,
            "admin@lab:22".to_string(),
            device,
        );
        (shell, inputs)
    }

    fn recorded(inputs: &Inputs) -> Vec<String> {
        inputs.lock().expect("journal lock").clone()
    }

    #[tokio::test]
    async fn ios_paging_marker_is_answered_with_space() {
        let handler = crate::templates::cisco_ios().expect("cisco template");
        let (mut shell, inputs) = scripted_shell(
            handler,
            "\r\nR1#",
            vec![
                (
                    "show running-config\n",
                    vec![
                        "show running-config\r\nBuilding configuration...\r\n\r\nhostname R1\r\n",
                        " --More-- ",
                    ],
                ),
                (
                    " ",
                    vec![
                        "\u{8}\u{8}\u{8}\u{8}\u{8}\u{8}\u{8}\u{8}\u{8}        \u{8}\u{8}\u{8}\u{8}\u{8}\u{8}\u{8}\u{8}\u{8}interface Loopback0\r\n!\r\nend\r\n\r\nR1#",
                    ],
                ),
            ],
        );
        shell.wait_for_prompt(TIMEOUT).await.expect("initial prompt");
        assert_eq!(shell.current_state(), "enable");

        let output = shell
            .write_with_timeout("show running-config", TIMEOUT)
            .await
            .expect("command output");

        assert!(output.success);
        assert_eq!(
            output.content,
            "Building configuration...\n\nhostname R1\ninterface Loopback0\n!\nend\n"
        );
        assert!(!output.all.contains("--More--"));
        assert_eq!(
            recorded(&inputs),
            vec!["show running-config\n".to_string(), " ".to_string()]
        );
    }

    #[tokio::test]
    async fn ios_invalid_input_is_rejected() {
        let handler = crate::templates::cisco_ios().expect("cisco template");
        let (mut shell, _inputs) = scripted_shell(
            handler,
            "R1#",
            vec![(
                "show running-confg\n",
                vec![
                    "show running-confg\r\n",
                    "                   ^\r\n% Invalid input detected at '^' marker.\r\n\r\n",
                    "R1#",
                ],
            )],
        );
        shell.wait_for_prompt(TIMEOUT).await.expect("initial prompt");

        let err = shell
            .execute("show running-confg", "Enable", TIMEOUT)
            .await
            .expect_err("device error line");

        match err {
            ConnectError::CommandRejected { command, output } => {
                assert_eq!(command, "show running-confg");
                assert!(output.contains("% Invalid input detected"));
            }
            other => panic!("unexpected error type: {other}"),
        }
        assert_eq!(shell.current_state(), "enable");
    }

    #[tokio::test]
    async fn failed_enable_never_sends_the_command() {
        let mut handler = crate::templates::cisco_ios().expect("cisco template");
        handler.dyn_param.insert(
            crate::templates::ENABLE_PASSWORD_PARAM.to_string(),
            "\n".to_string(),
        );
        let (mut shell, inputs) = scripted_shell(
            handler,
            "R1>",
            vec![
                ("enable\n", vec!["enable\r\n", "Password: "]),
                ("\n", vec!["\r\n% Bad secrets\r\n\r\nR1>"]),
            ],
        );
        shell.wait_for_prompt(TIMEOUT).await.expect("initial prompt");
        assert_eq!(shell.current_state(), "login");

        let err = shell
            .execute("show running-config", "Enable", TIMEOUT)
            .await
            .expect_err("enable should fail");

        assert!(matches!(
            err,
            ConnectError::CommandRejected { ref command, .. } if command == "show running-config"
        ));
        assert_eq!(shell.current_state(), "login");
        assert_eq!(
            recorded(&inputs),
            vec!["enable\n".to_string(), "\n".to_string()]
        );
    }

    #[tokio::test]
    async fn ios_enable_then_command_in_enable_mode() {
        let mut handler = crate::templates::cisco_ios().expect("cisco template");
        handler.dyn_param.insert(
            crate::templates::ENABLE_PASSWORD_PARAM.to_string(),
            "s3cret\n".to_string(),
        );
        let (mut shell, inputs) = scripted_shell(
            handler,
            "R1>",
            vec![
                ("enable\n", vec!["enable\r\nPassword: "]),
                ("s3cret\n", vec!["\r\nR1#"]),
                (
                    "show running-config\n",
                    vec!["show running-config\r\nhostname R1\r\n!\r\nR1#"],
                ),
            ],
        );
        shell.wait_for_prompt(TIMEOUT).await.expect("initial prompt");

        let config = shell
            .execute("show running-config", "Enable", TIMEOUT)
            .await
            .expect("config text");

        assert_eq!(config, "hostname R1\n!");
        assert_eq!(
            recorded(&inputs),
            vec![
                "enable\n".to_string(),
                "s3cret\n".to_string(),
                "show running-config\n".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn junos_display_set_output_across_pages() {
        let handler = crate::templates::juniper_junos().expect("juniper template");
        let (mut shell, inputs) = scripted_shell(
            handler,
            "\r\nadmin@R3> ",
            vec![
                (
                    "show configuration | display set\n",
                    vec![
                        "show configuration | display set\r\nset system host-name R3\r\n",
                        "---(more 50%)---",
                    ],
                ),
                (
                    " ",
                    vec!["\r                \rset interfaces ge-0/0/0 unit 0\r\n\r\nadmin@R3> "],
                ),
            ],
        );
        shell.wait_for_prompt(TIMEOUT).await.expect("initial prompt");

        let config = shell
            .execute("show configuration | display set", "Enable", TIMEOUT)
            .await
            .expect("config text");

        assert_eq!(
            config,
            "set system host-name R3\nset interfaces ge-0/0/0 unit 0\n"
        );
        assert_eq!(recorded(&inputs).len(), 2);
    }

    #[tokio::test]
    async fn junos_syntax_error_is_rejected() {
        let handler = crate::templates::juniper_junos().expect("juniper template");
        let (mut shell, _inputs) = scripted_shell(
            handler,
            "admin@R3> ",
            vec![(
                "show configuration | display sett\n",
                vec![
                    "show configuration | display sett\r\n",
                    "                               ^\r\nsyntax error.\r\nadmin@R3> ",
                ],
            )],
        );
        shell.wait_for_prompt(TIMEOUT).await.expect("initial prompt");

        let err = shell
            .execute("show configuration | display sett", "Enable", TIMEOUT)
            .await
            .expect_err("syntax error");

        assert!(matches!(err, ConnectError::CommandRejected { .. }));
    }

    #[tokio::test]
    async fn silent_device_times_out_waiting_for_prompt() {
        let handler = crate::templates::cisco_ios().expect("cisco template");
        let (mut shell, _inputs) = scripted_shell(handler, "Last login: never\r\n", vec![]);

        let err = shell
            .wait_for_prompt(Duration::from_millis(50))
            .await
            .expect_err("no prompt");

        assert!(matches!(
            err,
            ConnectError::InitTimeout(ref msg) if msg.contains("Last login")
        ));
    }

    #[tokio::test]
    async fn dropping_a_shell_stops_its_io_task() {
        let (to_device, _from_shell) = mpsc::channel::<String>(16);
        let (_to_shell, from_device) = mpsc::channel::<String>(16);
        let (held, mut released) = mpsc::channel::<()>(1);
        let io_task = tokio::spawn(async move {
            let _held = held;
            std::future::pending::<()>().await;
        });
        let mut shell = Shell::new(
            to_device,
            from_device,
            crate::templates::cisco_ios().expect("cisco template"),
            "admin@lab:22".to_string(),
            io_task,
        );
        assert!(shell.wait_for_prompt(Duration::from_millis(20)).await.is_err());

        drop(shell);

        let released = tokio::time::timeout(TIMEOUT, released.recv()).await;
        assert!(matches!(released, Ok(None)));
    }
}
