//! Command node
//!
//! The unit a host graph instantiates: one configured operation bound to one
//! server target. Every inbound trigger runs the operation once and ends in
//! exactly one outbound message or one error report.

pub mod host;
pub mod message;
pub mod request;

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

pub use host::{CollectingHost, ErrorReport, NodeHost, NodeStatus};
pub use message::Message;
pub use request::{build_request, generate_filename, RequestFields};

use crate::error::OperationError;
use crate::operation::{OperationExecutor, OperationKind};
use crate::profile::ConnectionProfile;
use crate::remote::Transport;
use crate::staging::StagingArea;

/// Static node settings. Non-empty values here override the trigger's.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfig {
    pub operation: OperationKind,
    #[serde(default)]
    pub workdir: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub target_filename: Option<String>,
    #[serde(default)]
    pub savedir: Option<String>,
    #[serde(default)]
    pub local_filename: Option<String>,
    /// Extension for generated upload names, `.txt` when unset
    #[serde(default)]
    pub file_extension: Option<String>,
}

impl NodeConfig {
    pub fn new(operation: OperationKind) -> Self {
        Self {
            operation,
            workdir: None,
            filename: None,
            target_filename: None,
            savedir: None,
            local_filename: None,
            file_extension: None,
        }
    }
}

pub struct CommandNode {
    config: NodeConfig,
    /// `None` when no server is bound; the node then ignores triggers
    executor: Option<OperationExecutor>,
    host: Arc<dyn NodeHost>,
}

impl CommandNode {
    pub fn new(
        config: NodeConfig,
        profile: Option<Arc<ConnectionProfile>>,
        transport: Arc<dyn Transport>,
        host: Arc<dyn NodeHost>,
    ) -> Self {
        let executor = match profile {
            Some(profile) => Some(OperationExecutor::new(profile, transport)),
            None => {
                let err = OperationError::Configuration("missing server configuration".to_string());
                error!("{} node disabled: {}", config.operation.as_str(), err);
                host.error(&err, None);
                None
            }
        };

        Self {
            config,
            executor,
            host,
        }
    }

    pub fn with_staging(mut self, staging: StagingArea) -> Self {
        self.executor = self.executor.map(|e| e.with_staging(staging));
        self
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn is_inert(&self) -> bool {
        self.executor.is_none()
    }

    /// Run the operation for one trigger and build the outbound message
    pub async fn process(&self, msg: &Message) -> Result<Message, OperationError> {
        let executor = self.executor.as_ref().ok_or_else(|| {
            OperationError::Configuration("missing server configuration".to_string())
        })?;

        let request = build_request(&self.config, msg)?;
        let result = executor.execute(request).await?;

        let mut out = msg.clone();
        out.payload = result.to_payload();
        if let Some(workdir) = result.workdir() {
            out.workdir = Some(workdir.to_string());
        }
        Ok(out)
    }

    /// Entry point per trigger.
    ///
    /// Never panics and never returns an error: the outcome is delivered
    /// through the host as one message or one error report.
    pub async fn handle_input(&self, msg: Message) {
        if self.is_inert() {
            debug!("Ignoring trigger, node has no server");
            return;
        }

        self.host.status(NodeStatus::Executing);

        let outcome = AssertUnwindSafe(self.process(&msg))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(OperationError::Unexpected(panic_message(panic))));

        match outcome {
            Ok(out) => {
                info!("{} completed", self.config.operation.as_str());
                self.host.send(out);
            }
            Err(e) => {
                error!("{} failed: {}", self.config.operation.as_str(), e);
                self.host.status(NodeStatus::Error);
                self.host.error(&e, Some(&msg));
            }
        }

        self.host.status(NodeStatus::Idle);
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "operation panicked".to_string()
    }
}
