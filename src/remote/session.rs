//! Remote session: one connection per operation

use tracing::{debug, info, warn};

use super::command::{CommandSequence, RawResponse, RemoteCommand};
use super::retry::connect_with_retry;
use super::transport::{Connection, Transport, TransportError};
use crate::error::OperationError;
use crate::profile::ConnectionProfile;

/// An open connection to the configured server, used for exactly one
/// command sequence and closed afterwards.
pub struct RemoteSession<'a> {
    profile: &'a ConnectionProfile,
    connection: Box<dyn Connection>,
}

impl<'a> RemoteSession<'a> {
    /// Connect using the profile's timeout and retry policy
    pub async fn open(
        profile: &'a ConnectionProfile,
        transport: &dyn Transport,
    ) -> Result<RemoteSession<'a>, OperationError> {
        let target = profile.target();
        let timeout = profile.timeout();

        let connection = connect_with_retry(
            move || {
                let attempt = transport.connect(profile);
                async move {
                    match tokio::time::timeout(timeout, attempt).await {
                        Ok(result) => result,
                        Err(_) => Err(TransportError::Timeout(timeout.as_secs())),
                    }
                }
            },
            &profile.retry_config(),
            &target,
        )
        .await
        .map_err(|(attempts, source)| OperationError::Connection { attempts, source })?;

        info!("Session opened to {}", target);
        Ok(Self {
            profile,
            connection,
        })
    }

    /// Execute the queued commands, preceded by the profile's extra
    /// commands, then close the session whatever the outcome.
    pub async fn execute(
        mut self,
        mut commands: CommandSequence,
    ) -> Result<RawResponse, OperationError> {
        commands.prepend(
            self.profile
                .extra_commands()
                .iter()
                .cloned()
                .map(RemoteCommand::Raw),
        );

        debug!(
            "Executing {} command(s) against {}",
            commands.len(),
            self.profile.target()
        );
        let result = self.connection.execute(&commands).await;

        if let Err(e) = self.connection.close().await {
            warn!("Failed to close session to {}: {}", self.profile.target(), e);
        }

        let response = result.map_err(|e| match e {
            // The client never ran, nothing reached the server
            TransportError::Spawn(_) => OperationError::Unexpected(e.to_string()),
            e => OperationError::Remote(e.to_string()),
        })?;
        if let Some(message) = response.error.as_deref().filter(|m| !m.trim().is_empty()) {
            return Err(OperationError::Remote(message.trim().to_string()));
        }

        Ok(response)
    }
}
