//! Seam between a command node and the graph runtime hosting it

use parking_lot::Mutex;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use super::message::Message;
use crate::error::OperationError;

/// Status indicator shown by the host next to the node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    /// An operation is in flight
    Executing,
    /// The last operation failed; cleared once the error is reported
    Error,
    /// Nothing in flight
    Idle,
}

impl Serialize for NodeStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let (fill, text) = match self {
            NodeStatus::Executing => ("blue", "executing"),
            NodeStatus::Error => ("red", "error"),
            NodeStatus::Idle => return serializer.serialize_struct("NodeStatus", 0)?.end(),
        };

        let mut s = serializer.serialize_struct("NodeStatus", 3)?;
        s.serialize_field("fill", fill)?;
        s.serialize_field("shape", "dot")?;
        s.serialize_field("text", text)?;
        s.end()
    }
}

/// Callbacks a node uses to talk back to its host.
///
/// Implementations must tolerate calls from concurrently running triggers.
pub trait NodeHost: Send + Sync {
    /// Emit a result message downstream
    fn send(&self, msg: Message);

    /// Report a failed operation, tagged with the trigger that caused it
    fn error(&self, err: &OperationError, trigger: Option<&Message>);

    fn status(&self, status: NodeStatus);
}

/// An error reported through [`NodeHost::error`]
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger: Option<Message>,
}

/// Host that buffers everything it is told
#[derive(Default)]
pub struct CollectingHost {
    sent: Mutex<Vec<Message>>,
    errors: Mutex<Vec<ErrorReport>>,
    statuses: Mutex<Vec<NodeStatus>>,
}

impl CollectingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Message> {
        self.sent.lock().clone()
    }

    pub fn errors(&self) -> Vec<ErrorReport> {
        self.errors.lock().clone()
    }

    pub fn statuses(&self) -> Vec<NodeStatus> {
        self.statuses.lock().clone()
    }

    /// Drain buffered outbound messages and error reports
    pub fn take(&self) -> (Vec<Message>, Vec<ErrorReport>) {
        (
            std::mem::take(&mut *self.sent.lock()),
            std::mem::take(&mut *self.errors.lock()),
        )
    }
}

impl NodeHost for CollectingHost {
    fn send(&self, msg: Message) {
        self.sent.lock().push(msg);
    }

    fn error(&self, err: &OperationError, trigger: Option<&Message>) {
        self.errors.lock().push(ErrorReport {
            code: err.kind(),
            message: err.to_string(),
            trigger: trigger.cloned(),
        });
    }

    fn status(&self, status: NodeStatus) {
        self.statuses.lock().push(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_shapes() {
        assert_eq!(
            serde_json::to_value(NodeStatus::Executing).unwrap(),
            json!({"fill": "blue", "shape": "dot", "text": "executing"})
        );
        assert_eq!(
            serde_json::to_value(NodeStatus::Error).unwrap(),
            json!({"fill": "red", "shape": "dot", "text": "error"})
        );
        assert_eq!(serde_json::to_value(NodeStatus::Idle).unwrap(), json!({}));
    }

    #[test]
    fn test_collecting_host_take_drains() {
        let host = CollectingHost::new();
        host.send(Message::new(json!("a")));
        host.error(&OperationError::Remote("boom".into()), None);

        let (sent, errors) = host.take();
        assert_eq!(sent.len(), 1);
        assert_eq!(errors[0].code, "REMOTE_OPERATION_ERROR");
        assert!(host.sent().is_empty());
        assert!(host.errors().is_empty());
    }
}
