//! Remote file operations: list, get, put, delete, move and raw commands.

pub mod executor;
pub mod types;

pub use executor::OperationExecutor;
pub use types::{OperationKind, OperationRequest, OperationResult};
