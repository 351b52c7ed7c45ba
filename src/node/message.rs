//! Trigger and result messages exchanged with the host graph

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A message flowing through the host graph.
///
/// Known routing fields are typed; everything else is carried through
/// untouched in `extra` so outbound messages keep the trigger's properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub payload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workdir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub savedir: Option<String>,
    #[serde(
        default,
        rename = "localFilename",
        skip_serializing_if = "Option::is_none"
    )]
    pub local_filename: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Message {
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
            ..Default::default()
        }
    }

    pub fn with_workdir(mut self, workdir: impl Into<String>) -> Self {
        self.workdir = Some(workdir.into());
        self
    }

    /// String field looked up in the payload first, then on the message
    /// itself
    pub(crate) fn lookup(&self, key: &str) -> Option<&str> {
        self.payload
            .get(key)
            .and_then(Value::as_str)
            .or_else(|| self.extra.get(key).and_then(Value::as_str))
    }
}
