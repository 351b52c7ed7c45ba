//! Server connection profile

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use zeroize::Zeroizing;

use crate::error::OperationError;
use crate::remote::RetryConfig;

/// Remote file protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Ftp,
    Sftp,
    Ftps,
}

impl Protocol {
    /// URL scheme used in the connection target
    pub fn scheme(&self) -> &'static str {
        match self {
            Protocol::Ftp => "ftp",
            Protocol::Sftp => "sftp",
            Protocol::Ftps => "ftps",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Protocol::Ftp => 21,
            Protocol::Sftp => 22,
            Protocol::Ftps => 990,
        }
    }
}

/// Server target settings as configured on the node, without secrets
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSettings {
    /// Remote host address
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default)]
    pub protocol: Protocol,

    /// Remote port (default depends on protocol)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Escape shell characters in path arguments
    #[serde(default = "default_true")]
    pub escape_shell_chars: bool,

    /// Retries after the first failed connection attempt
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Connection attempt timeout in seconds, `0` for the default
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Delay before the first retry, in seconds
    #[serde(default = "default_retry_interval")]
    pub retry_interval_secs: u64,

    /// Factor applied to the delay after every failed retry
    #[serde(default = "default_backoff_multiplier")]
    pub retry_backoff_multiplier: f64,

    #[serde(default)]
    pub requires_password: bool,

    /// Authenticate with an SSH private key (SFTP)
    #[serde(default, rename = "useSSHKey")]
    pub use_ssh_key: bool,

    #[serde(default, rename = "sshKeyPath")]
    pub ssh_key_path: String,

    /// Commands run at the start of every session, after login
    #[serde(default, deserialize_with = "deserialize_commands")]
    pub additional_commands: Vec<String>,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_true() -> bool {
    true
}

fn default_retry_count() -> u32 {
    2
}

fn default_timeout() -> u64 {
    10
}

fn default_retry_interval() -> u64 {
    5
}

fn default_backoff_multiplier() -> f64 {
    1.0
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            protocol: Protocol::default(),
            port: None,
            escape_shell_chars: true,
            retry_count: default_retry_count(),
            timeout_secs: default_timeout(),
            retry_interval_secs: default_retry_interval(),
            retry_backoff_multiplier: default_backoff_multiplier(),
            requires_password: false,
            use_ssh_key: false,
            ssh_key_path: String::new(),
            additional_commands: Vec::new(),
        }
    }
}

/// Accepts either a list of commands or one `;`-separated string.
fn deserialize_commands<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Commands {
        Joined(String),
        List(Vec<String>),
    }

    let commands = match Commands::deserialize(deserializer)? {
        Commands::Joined(joined) => joined.split(';').map(str::to_string).collect(),
        Commands::List(list) => list,
    };

    Ok(commands
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect())
}

/// Login credentials, stored apart from the settings
#[derive(Clone, Default, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: Zeroizing<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: Zeroizing::new(password.into()),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Immutable, validated connection profile for one server target.
///
/// Built once at configuration time and shared read-only by every operation.
#[derive(Debug, Clone)]
pub struct ConnectionProfile {
    settings: ServerSettings,
    credentials: Credentials,
}

impl ConnectionProfile {
    /// Merge settings and credentials, checking the authentication invariants
    pub fn new(settings: ServerSettings, credentials: Credentials) -> Result<Self, OperationError> {
        if settings.host.trim().is_empty() {
            return Err(OperationError::Configuration(
                "host must not be empty".to_string(),
            ));
        }
        if settings.use_ssh_key && settings.ssh_key_path.trim().is_empty() {
            return Err(OperationError::Configuration(
                "sshKeyPath is required when useSSHKey is set".to_string(),
            ));
        }
        if settings.requires_password && credentials.password.is_empty() {
            return Err(OperationError::Configuration(
                "password is required when requiresPassword is set".to_string(),
            ));
        }
        if !settings.retry_backoff_multiplier.is_finite() || settings.retry_backoff_multiplier < 0.0
        {
            return Err(OperationError::Configuration(format!(
                "invalid retry backoff multiplier: {}",
                settings.retry_backoff_multiplier
            )));
        }

        Ok(Self {
            settings,
            credentials,
        })
    }

    pub fn host(&self) -> &str {
        &self.settings.host
    }

    pub fn protocol(&self) -> Protocol {
        self.settings.protocol
    }

    pub fn port(&self) -> u16 {
        self.settings
            .port
            .unwrap_or_else(|| self.settings.protocol.default_port())
    }

    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    pub fn password(&self) -> &str {
        &self.credentials.password
    }

    pub fn requires_password(&self) -> bool {
        self.settings.requires_password
    }

    /// Key file to authenticate with, when key authentication is enabled
    pub fn ssh_key_path(&self) -> Option<&str> {
        if self.settings.use_ssh_key {
            Some(&self.settings.ssh_key_path)
        } else {
            None
        }
    }

    pub fn escape_shell_chars(&self) -> bool {
        self.settings.escape_shell_chars
    }

    pub fn extra_commands(&self) -> &[String] {
        &self.settings.additional_commands
    }

    /// Per-attempt timeout; `0` means the default
    pub fn timeout(&self) -> Duration {
        match self.settings.timeout_secs {
            0 => Duration::from_secs(default_timeout()),
            secs => Duration::from_secs(secs),
        }
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new(self.settings.retry_count).with_backoff(
            self.settings.retry_interval_secs,
            self.settings.retry_backoff_multiplier,
        )
    }

    /// Connection target, e.g. `sftp://example.com:22`
    pub fn target(&self) -> String {
        format!(
            "{}://{}:{}",
            self.settings.protocol.scheme(),
            self.settings.host,
            self.port()
        )
    }

    /// `host:port` pair for socket-level connects
    pub fn address(&self) -> String {
        format!("{}:{}", self.settings.host, self.port())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_document() {
        let settings: ServerSettings = serde_json::from_str("{}").unwrap();
        let profile = ConnectionProfile::new(settings, Credentials::default()).unwrap();

        assert_eq!(profile.host(), "localhost");
        assert_eq!(profile.protocol(), Protocol::Ftp);
        assert_eq!(profile.port(), 21);
        assert!(profile.escape_shell_chars());
        assert_eq!(profile.timeout(), Duration::from_secs(10));
        assert_eq!(profile.retry_config().max_retries, 2);
        assert_eq!(profile.target(), "ftp://localhost:21");
    }

    #[test]
    fn test_zero_timeout_uses_default() {
        let settings: ServerSettings = serde_json::from_str(r#"{"timeoutSecs": 0}"#).unwrap();
        let profile = ConnectionProfile::new(settings, Credentials::default()).unwrap();
        assert_eq!(profile.timeout(), Duration::from_secs(10));

        let settings = ServerSettings {
            timeout_secs: 3,
            ..Default::default()
        };
        let profile = ConnectionProfile::new(settings, Credentials::default()).unwrap();
        assert_eq!(profile.timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_port_follows_protocol() {
        let settings: ServerSettings =
            serde_json::from_str(r#"{"host": "files.example.com", "protocol": "sftp"}"#).unwrap();
        let profile = ConnectionProfile::new(settings, Credentials::default()).unwrap();
        assert_eq!(profile.target(), "sftp://files.example.com:22");

        let settings: ServerSettings =
            serde_json::from_str(r#"{"protocol": "ftps", "port": 2121}"#).unwrap();
        let profile = ConnectionProfile::new(settings, Credentials::default()).unwrap();
        assert_eq!(profile.address(), "localhost:2121");
    }

    #[test]
    fn test_additional_commands_string_or_list() {
        let settings: ServerSettings = serde_json::from_str(
            r#"{"additionalCommands": "set ftp:passive-mode on; ;set ssl:verify-certificate no"}"#,
        )
        .unwrap();
        assert_eq!(
            settings.additional_commands,
            vec!["set ftp:passive-mode on", "set ssl:verify-certificate no"]
        );

        let settings: ServerSettings =
            serde_json::from_str(r#"{"additionalCommands": ["set xfer:clobber on"]}"#).unwrap();
        assert_eq!(settings.additional_commands, vec!["set xfer:clobber on"]);
    }

    #[test]
    fn test_ssh_key_requires_path() {
        let settings = ServerSettings {
            protocol: Protocol::Sftp,
            use_ssh_key: true,
            ..Default::default()
        };
        let err = ConnectionProfile::new(settings, Credentials::default()).unwrap_err();
        assert_eq!(err.kind(), "CONFIGURATION_ERROR");

        let settings = ServerSettings {
            protocol: Protocol::Sftp,
            use_ssh_key: true,
            ssh_key_path: "/home/deploy/.ssh/id_ed25519".to_string(),
            ..Default::default()
        };
        let profile = ConnectionProfile::new(settings, Credentials::default()).unwrap();
        assert_eq!(profile.ssh_key_path(), Some("/home/deploy/.ssh/id_ed25519"));
    }

    #[test]
    fn test_requires_password() {
        let settings = ServerSettings {
            requires_password: true,
            ..Default::default()
        };
        assert!(ConnectionProfile::new(settings.clone(), Credentials::new("bob", "")).is_err());
        assert!(ConnectionProfile::new(settings, Credentials::new("bob", "s3cret")).is_ok());
    }

    #[test]
    fn test_debug_redacts_password() {
        let profile =
            ConnectionProfile::new(ServerSettings::default(), Credentials::new("bob", "s3cret"))
                .unwrap();
        let rendered = format!("{:?}", profile);
        assert!(rendered.contains("bob"));
        assert!(!rendered.contains("s3cret"));
    }
}
