//! Remote command sequences and their aggregated responses

use std::path::PathBuf;

use bytes::Bytes;

/// One step of a remote session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCommand {
    /// Change the remote working directory
    ChangeDir(String),
    /// List the current remote directory
    List,
    /// Print a remote file's contents
    Fetch(String),
    /// Upload a local file to a remote path
    Upload { local: PathBuf, remote: String },
    /// Remove a remote file
    Remove(String),
    /// Rename a remote path
    Rename { from: String, to: String },
    /// Protocol command passed through verbatim
    Raw(String),
}

/// Ordered commands executed within a single connection.
///
/// Built by the operation executor and consumed by one session execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSequence {
    commands: Vec<RemoteCommand>,
}

impl CommandSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a command, builder style
    pub fn then(mut self, command: RemoteCommand) -> Self {
        self.commands.push(command);
        self
    }

    pub fn push(&mut self, command: RemoteCommand) {
        self.commands.push(command);
    }

    /// Insert commands ahead of everything queued so far
    pub(crate) fn prepend<I>(&mut self, commands: I)
    where
        I: IntoIterator<Item = RemoteCommand>,
    {
        let mut all: Vec<RemoteCommand> = commands.into_iter().collect();
        all.append(&mut self.commands);
        self.commands = all;
    }

    pub fn commands(&self) -> &[RemoteCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl FromIterator<RemoteCommand> for CommandSequence {
    fn from_iter<T: IntoIterator<Item = RemoteCommand>>(iter: T) -> Self {
        Self {
            commands: iter.into_iter().collect(),
        }
    }
}

/// Aggregated output of a command sequence.
///
/// `error` is the application-level failure flag: when set, the remote side
/// reported failure for at least one command.
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    pub data: Bytes,
    pub error: Option<String>,
}

impl RawResponse {
    pub fn ok(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            data: Bytes::new(),
            error: Some(message.into()),
        }
    }

    /// Response data decoded as UTF-8, lossily
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}
