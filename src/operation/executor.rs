//! Operation executor
//!
//! Translates one [`OperationRequest`] into a remote command sequence, drives
//! a fresh [`RemoteSession`] for it and normalizes the response.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use super::types::{OperationRequest, OperationResult};
use crate::error::OperationError;
use crate::listing::parse_listing;
use crate::path_utils::resolve_remote_path;
use crate::profile::ConnectionProfile;
use crate::remote::{CommandSequence, RawResponse, RemoteCommand, RemoteSession, Transport};
use crate::staging::StagingArea;

/// Executes operations against one server target.
///
/// Holds no per-request state; concurrent calls each get their own session
/// and staged file.
#[derive(Clone)]
pub struct OperationExecutor {
    profile: Arc<ConnectionProfile>,
    transport: Arc<dyn Transport>,
    staging: StagingArea,
}

impl OperationExecutor {
    pub fn new(profile: Arc<ConnectionProfile>, transport: Arc<dyn Transport>) -> Self {
        Self {
            profile,
            transport,
            staging: StagingArea::system(),
        }
    }

    pub fn with_staging(mut self, staging: StagingArea) -> Self {
        self.staging = staging;
        self
    }

    pub fn profile(&self) -> &ConnectionProfile {
        &self.profile
    }

    pub async fn execute(&self, request: OperationRequest) -> Result<OperationResult, OperationError> {
        let kind = request.kind();
        debug!("Executing {} against {}", kind.as_str(), self.profile.target());

        let result = match request {
            OperationRequest::List { workdir } => {
                let mut commands = CommandSequence::new();
                if !workdir.is_empty() {
                    commands.push(RemoteCommand::ChangeDir(workdir.clone()));
                }
                commands.push(RemoteCommand::List);

                let response = self.run(commands).await?;
                let entries = parse_listing(&response.text());
                info!("Listed {} entries in {:?}", entries.len(), workdir);

                OperationResult::Listing { workdir, entries }
            }
            OperationRequest::Get {
                workdir,
                filename,
                save_to,
            } => {
                let filepath = resolve_remote_path(&workdir, &filename);
                let response = self
                    .run(CommandSequence::new().then(RemoteCommand::Fetch(filepath.clone())))
                    .await?;

                if let Some(local) = &save_to {
                    save_local(local, &response.data).await?;
                }

                OperationResult::File {
                    workdir,
                    filename,
                    filepath,
                    data: response.data,
                    localpath: save_to,
                }
            }
            OperationRequest::Put {
                workdir,
                filename,
                data,
            } => {
                let filepath = resolve_remote_path(&workdir, &filename);
                let staged = self.staging.stage(&data).await?;

                let outcome = self
                    .run(CommandSequence::new().then(RemoteCommand::Upload {
                        local: staged.path().to_path_buf(),
                        remote: filepath.clone(),
                    }))
                    .await;
                staged.release().await;
                outcome?;

                OperationResult::Path {
                    workdir,
                    filename,
                    filepath,
                }
            }
            OperationRequest::Delete { workdir, filename } => {
                let filepath = resolve_remote_path(&workdir, &filename);
                self.run(CommandSequence::new().then(RemoteCommand::Remove(filepath.clone())))
                    .await?;

                OperationResult::Path {
                    workdir,
                    filename,
                    filepath,
                }
            }
            OperationRequest::Move {
                workdir,
                filename,
                target_filename,
            } => {
                let from = resolve_remote_path(&workdir, &filename);
                let to = resolve_remote_path(&workdir, &target_filename);
                self.run(CommandSequence::new().then(RemoteCommand::Rename {
                    from,
                    to: to.clone(),
                }))
                .await?;

                OperationResult::Path {
                    workdir,
                    filename: target_filename,
                    filepath: to,
                }
            }
            OperationRequest::Raw { commands } => {
                if commands.is_empty() {
                    debug!("Empty raw command list, nothing to run");
                    OperationResult::Raw {
                        data: Default::default(),
                    }
                } else {
                    let response = self
                        .run(commands.into_iter().map(RemoteCommand::Raw).collect())
                        .await?;
                    OperationResult::Raw {
                        data: response.data,
                    }
                }
            }
        };

        debug!("{} against {} finished", kind.as_str(), self.profile.target());
        Ok(result)
    }

    async fn run(&self, commands: CommandSequence) -> Result<RawResponse, OperationError> {
        let session = RemoteSession::open(&self.profile, self.transport.as_ref()).await?;
        session.execute(commands).await
    }
}

async fn save_local(path: &Path, data: &[u8]) -> Result<(), OperationError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| OperationError::staging(path, e))?;
    }
    tokio::fs::write(path, data)
        .await
        .map_err(|e| OperationError::staging(path, e))?;

    debug!("Saved {} bytes to {}", data.len(), path.display());
    Ok(())
}
