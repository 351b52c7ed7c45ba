//! `lftp`-backed transport
//!
//! Every command sequence becomes one `lftp -c` script: session settings,
//! `open`, then the queued commands chained with `&&`. stdout carries the
//! response data and anything on stderr marks the response as failed.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::process::Command;
use tracing::{debug, info};

use super::command::{CommandSequence, RawResponse, RemoteCommand};
use super::transport::{Connection, Transport, TransportError};
use crate::profile::{ConnectionProfile, Protocol};

const DEFAULT_PROGRAM: &str = "lftp";
const PASSWORD_ENV: &str = "LFTP_PASSWORD";

/// Runs command sequences through the `lftp` program.
#[derive(Debug, Clone)]
pub struct LftpTransport {
    program: PathBuf,
}

impl LftpTransport {
    pub fn new() -> Self {
        Self::with_program(DEFAULT_PROGRAM)
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for LftpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for LftpTransport {
    /// lftp connects lazily, so establishment is checked with a TCP probe
    /// against the target before any command runs.
    async fn connect(
        &self,
        profile: &ConnectionProfile,
    ) -> Result<Box<dyn Connection>, TransportError> {
        let address = profile.address();
        let probe = TcpStream::connect(&address)
            .await
            .map_err(|e| TransportError::Connect {
                target: profile.target(),
                message: e.to_string(),
            })?;
        drop(probe);
        debug!("Reached {}", address);

        Ok(Box::new(LftpConnection {
            program: self.program.clone(),
            profile: profile.clone(),
        }))
    }
}

struct LftpConnection {
    program: PathBuf,
    profile: ConnectionProfile,
}

#[async_trait]
impl Connection for LftpConnection {
    async fn execute(&mut self, commands: &CommandSequence) -> Result<RawResponse, TransportError> {
        let script = render_script(&self.profile, commands);

        let mut command = Command::new(&self.program);
        command
            .arg("-c")
            .arg(&script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if !self.profile.password().is_empty() {
            command.env(PASSWORD_ENV, self.profile.password());
        }

        info!(
            "Running {} command(s) via {} against {}",
            commands.len(),
            self.program.display(),
            self.profile.target()
        );
        let output = command.output().await.map_err(|e| {
            TransportError::Spawn(format!("{}: {}", self.program.display(), e))
        })?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let error = if !stderr.is_empty() {
            Some(stderr)
        } else if !output.status.success() {
            Some(format!("lftp exited with {}", output.status))
        } else {
            None
        };

        Ok(RawResponse {
            data: output.stdout.into(),
            error,
        })
    }
}

/// Build the `lftp -c` script for a sequence
pub(crate) fn render_script(profile: &ConnectionProfile, commands: &CommandSequence) -> String {
    let escape = profile.escape_shell_chars();
    let mut parts = vec![
        format!("set net:timeout {}", profile.timeout().as_secs()),
        // Retries are driven by the session, a broken sequence is terminal
        "set net:max-retries 1".to_string(),
    ];

    if profile.protocol() == Protocol::Sftp {
        parts.push("set sftp:auto-confirm yes".to_string());
        if let Some(key) = profile.ssh_key_path() {
            parts.push(format!(
                "set sftp:connect-program \"ssh -a -x -i {}\"",
                quote_arg(key, escape)
            ));
        }
    }

    let mut open = String::from("open");
    if !profile.password().is_empty() {
        open.push_str(" --env-password");
    }
    if !profile.username().is_empty() {
        open.push_str(" -u ");
        open.push_str(&quote_arg(profile.username(), escape));
    }
    open.push(' ');
    open.push_str(&profile.target());
    parts.push(open);

    let mut script = parts.join("; ");
    // `&&` stops the script at the first failing command
    let queued: Vec<String> = commands
        .commands()
        .iter()
        .map(|c| render_command(c, escape))
        .collect();
    if !queued.is_empty() {
        script.push_str("; ");
        script.push_str(&queued.join(" && "));
    }
    script
}

fn render_command(command: &RemoteCommand, escape: bool) -> String {
    match command {
        RemoteCommand::ChangeDir(dir) => format!("cd {}", quote_arg(dir, escape)),
        RemoteCommand::List => "ls".to_string(),
        RemoteCommand::Fetch(path) => format!("cat {}", quote_arg(path, escape)),
        RemoteCommand::Upload { local, remote } => format!(
            "put {} -o {}",
            quote_arg(&local.to_string_lossy(), escape),
            quote_arg(remote, escape)
        ),
        RemoteCommand::Remove(path) => format!("rm {}", quote_arg(path, escape)),
        RemoteCommand::Rename { from, to } => format!(
            "mv {} {}",
            quote_arg(from, escape),
            quote_arg(to, escape)
        ),
        RemoteCommand::Raw(raw) => raw.clone(),
    }
}

/// Backslash-escape everything outside `[A-Za-z0-9_/:=.-]`
pub fn escape_shell(arg: &str) -> String {
    let mut out = String::with_capacity(arg.len());
    for c in arg.chars() {
        if !(c.is_ascii_alphanumeric() || matches!(c, '_' | '/' | ':' | '=' | '.' | '-')) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn quote_arg(arg: &str, escape: bool) -> String {
    if escape {
        escape_shell(arg)
    } else {
        arg.to_string()
    }
}
