//! Command-execution abstraction over the underlying FTP/SFTP client

use async_trait::async_trait;
use thiserror::Error;

use super::command::{CommandSequence, RawResponse};
use crate::profile::ConnectionProfile;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Could not connect to {target}: {message}")]
    Connect { target: String, message: String },

    #[error("Timed out after {0}s")]
    Timeout(u64),

    #[error("Failed to start client: {0}")]
    Spawn(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Connection-level failures are worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransportError::Connect { .. } | TransportError::Timeout(_) | TransportError::Io(_)
        )
    }
}

/// Opens connections to a server target.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(
        &self,
        profile: &ConnectionProfile,
    ) -> Result<Box<dyn Connection>, TransportError>;
}

/// One established connection.
#[async_trait]
pub trait Connection: Send {
    /// Run every queued command in order and aggregate the output.
    ///
    /// `Err` means the session itself broke down; a remote refusal of a
    /// command is reported through [`RawResponse::error`].
    async fn execute(&mut self, commands: &CommandSequence) -> Result<RawResponse, TransportError>;

    async fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}
