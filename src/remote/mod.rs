//! Remote session layer
//!
//! Connects to the configured server, runs one queued command sequence per
//! operation and closes the connection again. Connection establishment is
//! retried with backoff; command sequences never are.

pub mod command;
pub mod lftp;
pub mod retry;
pub mod session;
#[cfg(test)]
pub(crate) mod testing;
pub mod transport;

pub use command::{CommandSequence, RawResponse, RemoteCommand};
pub use lftp::LftpTransport;
pub use retry::{calculate_backoff, connect_with_retry, RetryConfig};
pub use session::RemoteSession;
pub use transport::{Connection, Transport, TransportError};
