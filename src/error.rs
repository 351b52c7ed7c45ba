//! Operation error types

use std::path::PathBuf;

use thiserror::Error;

use crate::remote::TransportError;

/// Failure of a single triggered operation.
///
/// An operation either emits exactly one result or fails with one of these;
/// nothing is emitted downstream on failure.
#[derive(Error, Debug)]
pub enum OperationError {
    /// No usable server target is bound to the node
    #[error("{0}")]
    Configuration(String),

    /// Connection could not be established, retries exhausted
    #[error("Connection failed after {attempts} attempt(s): {source}")]
    Connection {
        attempts: u32,
        #[source]
        source: TransportError,
    },

    /// The remote side (or the session running the command sequence) reported failure
    #[error("{0}")]
    Remote(String),

    /// Local temporary file could not be written
    #[error("Failed to stage payload at {}: {source}", path.display())]
    Staging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Inbound trigger carries nothing usable for the operation
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl OperationError {
    /// Stable machine-readable code for the error channel
    pub fn kind(&self) -> &'static str {
        match self {
            OperationError::Configuration(_) => "CONFIGURATION_ERROR",
            OperationError::Connection { .. } => "CONNECTION_ERROR",
            OperationError::Remote(_) => "REMOTE_OPERATION_ERROR",
            OperationError::Staging { .. } => "LOCAL_STAGING_ERROR",
            OperationError::InvalidPayload(_) => "INVALID_PAYLOAD",
            OperationError::Unexpected(_) => "UNEXPECTED_ERROR",
        }
    }

    pub(crate) fn staging(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        OperationError::Staging {
            path: path.into(),
            source,
        }
    }
}

// Serialized as `{code, message}` for the host's error channel
impl serde::Serialize for OperationError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut s = serializer.serialize_struct("OperationError", 2)?;
        s.serialize_field("code", self.kind())?;
        s.serialize_field("message", &self.to_string())?;
        s.end()
    }
}

impl From<serde_json::Error> for OperationError {
    fn from(err: serde_json::Error) -> Self {
        OperationError::InvalidPayload(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_carries_code_and_message() {
        let err = OperationError::Remote("cat: Access failed: 550 missing.txt".to_string());
        let value = serde_json::to_value(&err).unwrap();

        assert_eq!(value["code"], "REMOTE_OPERATION_ERROR");
        assert_eq!(value["message"], "cat: Access failed: 550 missing.txt");
    }

    #[test]
    fn test_connection_error_keeps_source() {
        let err = OperationError::Connection {
            attempts: 3,
            source: TransportError::Timeout(10),
        };

        assert_eq!(err.kind(), "CONNECTION_ERROR");
        assert!(err.to_string().contains("3 attempt(s)"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
