//! ftpflow - FTP/SFTP/FTPS file operations for message-driven dataflow graphs
//!
//! A [`CommandNode`] is bound to one server target and one operation (list,
//! get, put, delete, move or raw). Each inbound message triggers the
//! operation once over a fresh remote session and produces either one
//! outbound message or one error report through the [`NodeHost`].

pub mod error;
pub mod listing;
pub mod node;
pub mod operation;
pub mod path_utils;
pub mod profile;
pub mod remote;
pub mod staging;

pub use error::OperationError;
pub use listing::{FileEntry, FileType};
pub use node::{CollectingHost, CommandNode, Message, NodeConfig, NodeHost, NodeStatus};
pub use operation::{OperationExecutor, OperationKind, OperationRequest, OperationResult};
pub use profile::{ConnectionProfile, Credentials, Protocol, ServerSettings};
pub use remote::{LftpTransport, RemoteSession, Transport, TransportError};
pub use staging::{StagedFile, StagingArea};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global tracing subscriber.
///
/// Filter comes from `RUST_LOG` (default `info`). Output goes to stderr so
/// stdout stays free for result messages. Later calls are no-ops.
pub fn init_logging() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
