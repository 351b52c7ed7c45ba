//! Operation request and result types

use std::path::PathBuf;

use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::listing::FileEntry;

/// Operation a command node performs on every trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    List,
    Get,
    Put,
    Delete,
    Move,
    Raw,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::List => "list",
            OperationKind::Get => "get",
            OperationKind::Put => "put",
            OperationKind::Delete => "delete",
            OperationKind::Move => "move",
            OperationKind::Raw => "raw",
        }
    }
}

/// A fully resolved request; each variant carries what its operation needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationRequest {
    List {
        workdir: String,
    },
    Get {
        workdir: String,
        filename: String,
        /// Also write the fetched bytes to this local file
        save_to: Option<PathBuf>,
    },
    Put {
        workdir: String,
        filename: String,
        data: Vec<u8>,
    },
    Delete {
        workdir: String,
        filename: String,
    },
    Move {
        workdir: String,
        filename: String,
        target_filename: String,
    },
    Raw {
        commands: Vec<String>,
    },
}

impl OperationRequest {
    pub fn kind(&self) -> OperationKind {
        match self {
            OperationRequest::List { .. } => OperationKind::List,
            OperationRequest::Get { .. } => OperationKind::Get,
            OperationRequest::Put { .. } => OperationKind::Put,
            OperationRequest::Delete { .. } => OperationKind::Delete,
            OperationRequest::Move { .. } => OperationKind::Move,
            OperationRequest::Raw { .. } => OperationKind::Raw,
        }
    }
}

/// Normalized outcome of a successful operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationResult {
    Listing {
        workdir: String,
        entries: Vec<FileEntry>,
    },
    File {
        workdir: String,
        filename: String,
        filepath: String,
        data: Bytes,
        localpath: Option<PathBuf>,
    },
    Path {
        workdir: String,
        filename: String,
        filepath: String,
    },
    Raw {
        data: Bytes,
    },
}

impl OperationResult {
    /// Working directory to stamp on the outbound message
    pub fn workdir(&self) -> Option<&str> {
        match self {
            OperationResult::Listing { workdir, .. }
            | OperationResult::File { workdir, .. }
            | OperationResult::Path { workdir, .. } => Some(workdir),
            OperationResult::Raw { .. } => None,
        }
    }

    /// Outbound payload.
    ///
    /// File data is emitted as a string when it is valid UTF-8 and as
    /// base64 (with `encoding: "base64"`) otherwise.
    pub fn to_payload(&self) -> Value {
        match self {
            OperationResult::Listing { entries, .. } => {
                serde_json::to_value(entries).unwrap_or(Value::Array(Vec::new()))
            }
            OperationResult::File {
                filename,
                filepath,
                data,
                localpath,
                ..
            } => {
                let mut payload = Map::new();
                match std::str::from_utf8(data) {
                    Ok(text) => {
                        payload.insert("filedata".into(), Value::String(text.to_string()));
                    }
                    Err(_) => {
                        let encoded = base64::engine::general_purpose::STANDARD.encode(data);
                        payload.insert("filedata".into(), Value::String(encoded));
                        payload.insert("encoding".into(), json!("base64"));
                    }
                }
                payload.insert("filename".into(), json!(filename));
                payload.insert("filepath".into(), json!(filepath));
                if let Some(local) = localpath {
                    payload.insert("localpath".into(), json!(local.to_string_lossy()));
                }
                Value::Object(payload)
            }
            OperationResult::Path {
                filename, filepath, ..
            } => json!({ "filename": filename, "filepath": filepath }),
            OperationResult::Raw { data } => Value::String(String::from_utf8_lossy(data).into_owned()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_payload_text_and_binary() {
        let text = OperationResult::File {
            workdir: "/in".into(),
            filename: "a.txt".into(),
            filepath: "/in/a.txt".into(),
            data: Bytes::from_static(b"hello"),
            localpath: None,
        };
        assert_eq!(
            text.to_payload(),
            json!({"filedata": "hello", "filename": "a.txt", "filepath": "/in/a.txt"})
        );

        let binary = OperationResult::File {
            workdir: "/in".into(),
            filename: "a.bin".into(),
            filepath: "/in/a.bin".into(),
            data: Bytes::from_static(&[0xff, 0x00, 0x10]),
            localpath: Some(PathBuf::from("saved/a.bin")),
        };
        let payload = binary.to_payload();
        assert_eq!(payload["filedata"], "/wAQ");
        assert_eq!(payload["encoding"], "base64");
        assert!(payload["localpath"].as_str().unwrap().ends_with("a.bin"));
    }

    #[test]
    fn test_raw_result_has_no_workdir() {
        let raw = OperationResult::Raw {
            data: Bytes::from_static(b"257 \"/\"\n"),
        };
        assert_eq!(raw.workdir(), None);
        assert_eq!(raw.to_payload(), json!("257 \"/\"\n"));
    }

    #[test]
    fn test_operation_kind_serde() {
        let kind: OperationKind = serde_json::from_str("\"move\"").unwrap();
        assert_eq!(kind, OperationKind::Move);
        assert_eq!(kind.as_str(), "move");
    }
}
