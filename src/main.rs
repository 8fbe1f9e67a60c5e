//! Email MCP Server
//!
//! Exposes `get_unread_emails` and `create_draft_reply` to an AI assistant
//! over the Model Context Protocol on stdio.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use email_mcp_server::config::Config;
use email_mcp_server::error::Result;
use email_mcp_server::gmail::auth::{Authenticator, GoogleOAuth};
use email_mcp_server::gmail::client::GmailClient;
use email_mcp_server::gmail::service::MailService;
use email_mcp_server::gmail::store::FileCredentialStore;
use email_mcp_server::mcp::server::McpServer;
use email_mcp_server::mcp::tools::ToolHandler;

/// Email MCP Server
#[derive(Parser)]
#[command(name = "email-mcp-server")]
#[command(author, version, about = "Email MCP Server - list unread Gmail and draft threaded replies")]
struct Cli {
    /// OAuth client file downloaded from Google Cloud Console
    #[arg(long, global = true)]
    credentials_path: Option<PathBuf>,

    /// Where the user token is stored
    #[arg(long, global = true)]
    token_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Authorize Gmail access now instead of on the first tool call
    Auth,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries JSON-RPC
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::new()?;
    if let Some(path) = cli.credentials_path {
        config = config.with_oauth_path(path);
    }
    if let Some(path) = cli.token_path {
        config = config.with_token_path(path);
    }
    config.find_and_copy_oauth_keys(&std::env::current_dir()?)?;

    if !config.oauth_keys_exist() {
        eprintln!("Error: OAuth client file not found at {}.", config.oauth_path.display());
        eprintln!(
            "Download it from https://console.cloud.google.com/apis/credentials and place it in the current directory or {}",
            config.config_dir.display()
        );
        std::process::exit(1);
    }

    let authenticator = Arc::new(Authenticator::new(
        Arc::new(FileCredentialStore::new(&config.token_path)),
        Arc::new(GoogleOAuth::new(&config)?),
    ));

    match cli.command {
        Some(Commands::Auth) => {
            authenticator.get_valid_credential().await?;
            eprintln!(
                "Authorization completed. Token stored at {}",
                config.token_path.display()
            );
        }
        None => {
            if !authenticator.is_authenticated().await {
                tracing::warn!(
                    "no stored token; consent will be requested on the first tool call (or run `email-mcp-server auth`)"
                );
            }
            run_server(authenticator).await?;
        }
    }

    Ok(())
}

async fn run_server(authenticator: Arc<Authenticator>) -> Result<()> {
    let mail = Arc::new(MailService::new(authenticator, Arc::new(GmailClient::new())));

    let mut server = McpServer::new(ToolHandler::new(mail));
    tracing::info!("serving MCP on stdio");
    server.run_stdio().await
}
