//! Run one command-node operation from the command line.
//!
//! ```text
//! ftpflow --config node.json [--message trigger.json]
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use serde::Deserialize;
use tokio::io::AsyncReadExt;
use tracing::{debug, error};

use ftpflow::{
    init_logging, CollectingHost, CommandNode, ConnectionProfile, Credentials, LftpTransport,
    Message, NodeConfig, OperationError, ServerSettings,
};

const USERNAME_ENV: &str = "FTPFLOW_USERNAME";
const PASSWORD_ENV: &str = "FTPFLOW_PASSWORD";

#[derive(Parser, Debug)]
#[command(name = "ftpflow", version, about = "Run an FTP/SFTP/FTPS file operation")]
struct Cli {
    /// Node configuration: {"server": ..., "credentials": ..., "node": ...}
    #[arg(short, long)]
    config: PathBuf,

    /// Trigger message as JSON; read from stdin when omitted
    #[arg(short, long)]
    message: Option<PathBuf>,

    /// Program used to run remote command sequences
    #[arg(long, default_value = "lftp")]
    lftp: String,
}

#[derive(Deserialize)]
struct NodeDocument {
    #[serde(default)]
    server: Option<ServerSettings>,
    #[serde(default)]
    credentials: Option<Credentials>,
    node: NodeConfig,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{}", e);
            print_error(&e);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether the operation succeeded
async fn run(cli: Cli) -> Result<bool, OperationError> {
    let document: NodeDocument = serde_json::from_str(&read_file(&cli.config).await?)
        .map_err(|e| OperationError::Configuration(format!("Invalid config {}: {}", cli.config.display(), e)))?;

    let profile = match document.server {
        Some(settings) => {
            let credentials = document.credentials.unwrap_or_else(credentials_from_env);
            Some(Arc::new(ConnectionProfile::new(settings, credentials)?))
        }
        None => None,
    };

    let trigger = match &cli.message {
        Some(path) => read_file(path).await?,
        None => {
            let mut input = String::new();
            tokio::io::stdin()
                .read_to_string(&mut input)
                .await
                .map_err(|e| OperationError::Configuration(format!("Failed to read stdin: {}", e)))?;
            input
        }
    };
    let trigger: Message = if trigger.trim().is_empty() {
        Message::default()
    } else {
        serde_json::from_str(&trigger)?
    };
    debug!("Trigger: {:?}", trigger);

    let host = Arc::new(CollectingHost::new());
    let node = CommandNode::new(
        document.node,
        profile,
        Arc::new(LftpTransport::with_program(cli.lftp)),
        host.clone(),
    );
    node.handle_input(trigger).await;

    let (sent, errors) = host.take();
    for msg in &sent {
        match serde_json::to_string(msg) {
            Ok(line) => println!("{}", line),
            Err(e) => error!("Failed to encode result message: {}", e),
        }
    }
    for report in &errors {
        match serde_json::to_string(report) {
            Ok(line) => eprintln!("{}", line),
            Err(e) => error!("Failed to encode error report: {}", e),
        }
    }

    Ok(errors.is_empty())
}

fn credentials_from_env() -> Credentials {
    Credentials::new(
        std::env::var(USERNAME_ENV).unwrap_or_default(),
        std::env::var(PASSWORD_ENV).unwrap_or_default(),
    )
}

async fn read_file(path: &Path) -> Result<String, OperationError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| OperationError::Configuration(format!("Failed to read {}: {}", path.display(), e)))
}

fn print_error(err: &OperationError) {
    match serde_json::to_string(err) {
        Ok(line) => eprintln!("{}", line),
        Err(_) => eprintln!("{}", err),
    }
}
