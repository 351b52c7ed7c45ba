//! Scripted in-memory transport for tests

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::command::{CommandSequence, RawResponse, RemoteCommand};
use super::transport::{Connection, Transport, TransportError};
use crate::profile::ConnectionProfile;

#[derive(Default)]
struct State {
    hanging_connects: u32,
    failing_connects: u32,
    connects: u32,
    closed: u32,
    responses: VecDeque<RawResponse>,
    break_with: Option<String>,
    spawn_failure: Option<String>,
    panic_with: Option<String>,
    executed: Vec<CommandSequence>,
    /// (remote path, staged bytes) as seen while the sequence ran
    uploads: Vec<(String, Option<Vec<u8>>)>,
}

/// Replays configured connect failures and responses, recording every
/// command sequence it is asked to run.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    state: Arc<Mutex<State>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the response for the next execution
    pub fn respond(self, response: RawResponse) -> Self {
        self.state.lock().responses.push_back(response);
        self
    }

    /// Fail the first `n` connection attempts
    pub fn fail_connects(self, n: u32) -> Self {
        self.state.lock().failing_connects = n;
        self
    }

    /// Never resolve the first `n` connection attempts
    pub fn hang_connects(self, n: u32) -> Self {
        self.state.lock().hanging_connects = n;
        self
    }

    /// Make execution fail as if the client program could not be started
    pub fn fail_spawn(self, message: &str) -> Self {
        self.state.lock().spawn_failure = Some(message.to_string());
        self
    }

    /// Make execution itself fail at the transport level
    pub fn break_during_execute(self, message: &str) -> Self {
        self.state.lock().break_with = Some(message.to_string());
        self
    }

    pub fn panic_during_execute(self, message: &str) -> Self {
        self.state.lock().panic_with = Some(message.to_string());
        self
    }

    pub fn connects(&self) -> u32 {
        self.state.lock().connects
    }

    pub fn closed(&self) -> u32 {
        self.state.lock().closed
    }

    pub fn executed(&self) -> Vec<CommandSequence> {
        self.state.lock().executed.clone()
    }

    pub fn uploads(&self) -> Vec<(String, Option<Vec<u8>>)> {
        self.state.lock().uploads.clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn connect(
        &self,
        profile: &ConnectionProfile,
    ) -> Result<Box<dyn Connection>, TransportError> {
        let hang = {
            let mut state = self.state.lock();
            state.connects += 1;
            if state.hanging_connects > 0 {
                state.hanging_connects -= 1;
                true
            } else if state.failing_connects > 0 {
                state.failing_connects -= 1;
                return Err(TransportError::Connect {
                    target: profile.target(),
                    message: "Connection refused".to_string(),
                });
            } else {
                false
            }
        };
        if hang {
            return std::future::pending().await;
        }

        Ok(Box::new(ScriptedConnection {
            state: self.state.clone(),
        }))
    }
}

struct ScriptedConnection {
    state: Arc<Mutex<State>>,
}

#[async_trait]
impl Connection for ScriptedConnection {
    async fn execute(&mut self, commands: &CommandSequence) -> Result<RawResponse, TransportError> {
        let mut state = self.state.lock();
        state.executed.push(commands.clone());

        for command in commands.commands() {
            if let RemoteCommand::Upload { local, remote } = command {
                let staged = std::fs::read(local).ok();
                state.uploads.push((remote.clone(), staged));
            }
        }

        if let Some(message) = state.panic_with.clone() {
            drop(state);
            panic!("{}", message);
        }
        if let Some(message) = &state.spawn_failure {
            return Err(TransportError::Spawn(message.clone()));
        }
        if let Some(message) = &state.break_with {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                message.clone(),
            )));
        }

        Ok(state.responses.pop_front().unwrap_or_default())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.state.lock().closed += 1;
        Ok(())
    }
}
