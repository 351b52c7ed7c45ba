//! Builds an [`OperationRequest`] from the node's static settings and an
//! inbound trigger.

use std::sync::atomic::{AtomicI64, Ordering};

use base64::Engine;
use serde_json::Value;

use super::message::Message;
use super::NodeConfig;
use crate::error::OperationError;
use crate::operation::{OperationKind, OperationRequest};
use crate::path_utils::join_local_path;

const DEFAULT_EXTENSION: &str = ".txt";

/// Last timestamp handed out by [`generate_filename`]
static LAST_GENERATED: AtomicI64 = AtomicI64::new(0);

/// Request fields after applying precedence: a non-empty statically
/// configured value wins over the trigger's, and missing fields are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestFields {
    pub workdir: String,
    pub filename: String,
    pub target_filename: String,
    pub savedir: String,
    pub local_filename: String,
}

impl RequestFields {
    pub fn resolve(config: &NodeConfig, msg: &Message) -> Self {
        Self {
            workdir: pick(&config.workdir, msg.workdir.as_deref()),
            filename: pick(&config.filename, msg.lookup("filename")),
            target_filename: pick(&config.target_filename, msg.lookup("targetFilename")),
            savedir: pick(&config.savedir, msg.savedir.as_deref()),
            local_filename: pick(&config.local_filename, msg.local_filename.as_deref()),
        }
    }
}

fn pick(configured: &Option<String>, supplied: Option<&str>) -> String {
    configured
        .as_deref()
        .filter(|v| !v.is_empty())
        .or(supplied)
        .unwrap_or_default()
        .to_string()
}

/// Turn a trigger into the request for the node's operation
pub fn build_request(config: &NodeConfig, msg: &Message) -> Result<OperationRequest, OperationError> {
    let fields = RequestFields::resolve(config, msg);

    let request = match config.operation {
        OperationKind::List => OperationRequest::List {
            workdir: fields.workdir,
        },
        OperationKind::Get => {
            let save_to = (!fields.savedir.is_empty()).then(|| {
                let name = if fields.local_filename.is_empty() {
                    &fields.filename
                } else {
                    &fields.local_filename
                };
                join_local_path(&fields.savedir, name)
            });
            OperationRequest::Get {
                workdir: fields.workdir,
                filename: fields.filename,
                save_to,
            }
        }
        OperationKind::Put => {
            let data = upload_bytes(&msg.payload)?;
            let filename = if fields.filename.is_empty() {
                generate_filename(config.file_extension.as_deref())
            } else {
                fields.filename
            };
            OperationRequest::Put {
                workdir: fields.workdir,
                filename,
                data,
            }
        }
        OperationKind::Delete => OperationRequest::Delete {
            workdir: fields.workdir,
            filename: fields.filename,
        },
        OperationKind::Move => OperationRequest::Move {
            workdir: fields.workdir,
            filename: fields.filename,
            target_filename: fields.target_filename,
        },
        OperationKind::Raw => OperationRequest::Raw {
            commands: raw_commands(&msg.payload)?,
        },
    };

    Ok(request)
}

/// Timestamp-based name for uploads without a filename.
///
/// Names are strictly increasing across the process even when two uploads
/// land in the same millisecond.
pub fn generate_filename(extension: Option<&str>) -> String {
    let now = chrono::Utc::now().timestamp_millis();
    let mut last = LAST_GENERATED.load(Ordering::Relaxed);
    let stamp = loop {
        let next = now.max(last + 1);
        match LAST_GENERATED.compare_exchange_weak(last, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => break next,
            Err(current) => last = current,
        }
    };

    let extension = extension.map(str::trim).filter(|e| !e.is_empty()).unwrap_or(DEFAULT_EXTENSION);
    if extension.starts_with('.') {
        format!("{}{}", stamp, extension)
    } else {
        format!("{}.{}", stamp, extension)
    }
}

/// Bytes to upload for a put trigger.
///
/// `payload.filedata` is used when present (string, base64 string with
/// `encoding: "base64"`, or an array of byte values); otherwise the whole
/// payload is encoded as compact JSON text.
pub fn upload_bytes(payload: &Value) -> Result<Vec<u8>, OperationError> {
    if payload.is_null() {
        return Err(OperationError::InvalidPayload(
            "put requires a payload".to_string(),
        ));
    }

    match payload.get("filedata") {
        Some(Value::String(text)) => {
            if payload.get("encoding").and_then(Value::as_str) == Some("base64") {
                base64::engine::general_purpose::STANDARD
                    .decode(text)
                    .map_err(|e| OperationError::InvalidPayload(format!("Invalid base64 filedata: {}", e)))
            } else {
                Ok(text.as_bytes().to_vec())
            }
        }
        Some(Value::Array(items)) if is_byte_array(items) => Ok(items
            .iter()
            .filter_map(Value::as_u64)
            .map(|b| b as u8)
            .collect()),
        Some(Value::Null) | None => Ok(serde_json::to_vec(payload)?),
        Some(other) => Ok(serde_json::to_vec(other)?),
    }
}

fn is_byte_array(items: &[Value]) -> bool {
    items
        .iter()
        .all(|v| v.as_u64().is_some_and(|b| b <= u8::MAX as u64))
}

/// Commands for a raw trigger: one string or an ordered list of strings
pub fn raw_commands(payload: &Value) -> Result<Vec<String>, OperationError> {
    match payload {
        Value::Null => Ok(Vec::new()),
        Value::String(command) if command.trim().is_empty() => Ok(Vec::new()),
        Value::String(command) => Ok(vec![command.clone()]),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    OperationError::InvalidPayload(format!("Raw command must be a string, got {}", item))
                })
            })
            .collect(),
        other => Err(OperationError::InvalidPayload(format!(
            "Raw payload must be a string or a list of strings, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    fn msg(value: Value) -> Message {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_static_value_wins() {
        let mut config = NodeConfig::new(OperationKind::List);
        config.workdir = Some("/static".into());

        let fields = RequestFields::resolve(&config, &msg(json!({"workdir": "/dynamic"})));
        assert_eq!(fields.workdir, "/static");
    }

    #[test]
    fn test_empty_static_value_falls_back() {
        let mut config = NodeConfig::new(OperationKind::Get);
        config.filename = Some(String::new());

        let fields = RequestFields::resolve(
            &config,
            &msg(json!({"savedir": "/tmp/in", "payload": {"filename": "a.txt"}})),
        );
        assert_eq!(fields.filename, "a.txt");
        assert_eq!(fields.savedir, "/tmp/in");
        assert_eq!(fields.workdir, "");
        assert_eq!(fields.target_filename, "");
    }

    #[test]
    fn test_get_save_path_uses_local_filename() {
        let mut config = NodeConfig::new(OperationKind::Get);
        config.savedir = Some("/var/in".into());

        let request = build_request(
            &config,
            &msg(json!({"localFilename": "copy.csv", "payload": {"filename": "data.csv"}})),
        )
        .unwrap();

        assert_eq!(
            request,
            OperationRequest::Get {
                workdir: String::new(),
                filename: "data.csv".into(),
                save_to: Some(PathBuf::from("/var/in").join("copy.csv")),
            }
        );
    }

    #[test]
    fn test_generated_filenames_are_distinct() {
        let first = generate_filename(None);
        let second = generate_filename(None);

        assert!(!first.is_empty());
        assert!(first.ends_with(".txt"));
        assert!(second.ends_with(".txt"));
        assert_ne!(first, second);

        let stamp = |name: &str| name.trim_end_matches(".txt").parse::<i64>().unwrap();
        assert!(stamp(&second) > stamp(&first));
    }

    #[test]
    fn test_generated_filename_extension() {
        assert!(generate_filename(Some("csv")).ends_with(".csv"));
        assert!(generate_filename(Some(".json")).ends_with(".json"));
        assert!(generate_filename(Some("  ")).ends_with(".txt"));
    }

    #[test]
    fn test_put_without_filename_generates_one() {
        let config = NodeConfig::new(OperationKind::Put);
        let request = build_request(&config, &msg(json!({"payload": {"filedata": "x"}}))).unwrap();

        match request {
            OperationRequest::Put { filename, data, .. } => {
                assert!(filename.ends_with(".txt"));
                assert_eq!(data, b"x");
            }
            other => panic!("Expected put, got {:?}", other),
        }
    }

    #[test]
    fn test_upload_bytes_encodings() {
        assert_eq!(upload_bytes(&json!({"filedata": "héllo"})).unwrap(), "héllo".as_bytes());
        assert_eq!(
            upload_bytes(&json!({"filedata": "/wAQ", "encoding": "base64"})).unwrap(),
            vec![0xff, 0x00, 0x10]
        );
        assert_eq!(upload_bytes(&json!({"filedata": [1, 2, 255]})).unwrap(), vec![1, 2, 255]);
        assert_eq!(
            upload_bytes(&json!({"filedata": {"a": 1}})).unwrap(),
            br#"{"a":1}"#.to_vec()
        );
        assert_eq!(upload_bytes(&json!({"a": 1})).unwrap(), br#"{"a":1}"#.to_vec());
        assert_eq!(upload_bytes(&json!("plain")).unwrap(), br#""plain""#.to_vec());
    }

    #[test]
    fn test_upload_bytes_rejects_missing_payload() {
        let err = upload_bytes(&Value::Null).unwrap_err();
        assert_eq!(err.kind(), "INVALID_PAYLOAD");

        let err = upload_bytes(&json!({"filedata": "!!", "encoding": "base64"})).unwrap_err();
        assert_eq!(err.kind(), "INVALID_PAYLOAD");
    }

    #[test]
    fn test_raw_commands() {
        assert_eq!(raw_commands(&json!("pwd")).unwrap(), vec!["pwd"]);
        assert_eq!(
            raw_commands(&json!(["mkdir /a", "rmdir /a"])).unwrap(),
            vec!["mkdir /a", "rmdir /a"]
        );
        assert!(raw_commands(&json!([])).unwrap().is_empty());
        assert!(raw_commands(&json!("")).unwrap().is_empty());
        assert!(raw_commands(&Value::Null).unwrap().is_empty());
        assert_eq!(raw_commands(&json!(42)).unwrap_err().kind(), "INVALID_PAYLOAD");
        assert_eq!(raw_commands(&json!(["ok", 1])).unwrap_err().kind(), "INVALID_PAYLOAD");
    }
}
