use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use calmail_mcp::auth::consent::LoopbackConsent;
use calmail_mcp::auth::provider::google::GoogleProvider;
use calmail_mcp::auth::store::FileCredentialStore;
use calmail_mcp::auth::Authenticator;
use calmail_mcp::common::create_http_client;
use calmail_mcp::config::{ClientConfig, Integration, Settings};
use calmail_mcp::google::{Endpoints, GoogleWorkspace};
use calmail_mcp::server::McpServer;
use calmail_mcp::tools::Dispatcher;
use calmail_protocol::LineTransport;

#[derive(Parser, Debug)]
#[command(name = "calmail-mcp", version, about = "Google Calendar and Gmail tools over MCP stdio")]
struct Args {
    /// Which Google product this instance serves
    #[arg(long, value_enum, default_value_t = Integration::Calendar)]
    integration: Integration,

    /// Directory holding credentials.json and token files (default: $CALMAIL_HOME or ~/.calmail)
    #[arg(long)]
    home: Option<PathBuf>,

    /// OAuth client secret file downloaded from Google Cloud Console
    #[arg(long)]
    client_secret: Option<PathBuf>,

    /// Token cache file (default: <home>/<integration>_token.json)
    #[arg(long)]
    token_file: Option<PathBuf>,

    /// Loopback port for the OAuth redirect (0 picks a free port)
    #[arg(long, default_value_t = 0)]
    consent_port: u16,

    /// Print the consent URL instead of opening a browser
    #[arg(long)]
    no_browser: bool,

    /// Log level when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, Default)]
enum Command {
    /// Run the MCP server on stdio
    #[default]
    Serve,
    /// Run the browser consent flow and cache the token
    Auth,
    /// Revoke and delete the cached token
    Logout,
    /// Print the credential state as JSON
    Status,
}

type GoogleAuthenticator = Authenticator<FileCredentialStore, GoogleProvider, LoopbackConsent>;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let settings = Settings::resolve(
        args.integration,
        args.home.clone(),
        args.client_secret.clone(),
        args.token_file.clone(),
    )?;
    info!(
        integration = %settings.integration,
        token_file = %settings.token_path.display(),
        "starting calmail-mcp"
    );

    let mut authenticator = build_authenticator(&args, &settings)?;

    match args.command.unwrap_or_default() {
        Command::Serve => {
            let http = create_http_client().context("failed to build HTTP client")?;
            let api = GoogleWorkspace::new(http, Endpoints::default());
            let dispatcher = Dispatcher::new(settings.integration, authenticator, api);
            let mut server = McpServer::new(dispatcher);
            let mut transport = LineTransport::stdio();
            server.serve(&mut transport).await?;
        }
        Command::Auth => {
            authenticator
                .authorize_interactively()
                .await
                .context("authorization failed")?;
            println!("Authentication successful!");
        }
        Command::Logout => {
            authenticator.revoke().await.context("logout failed")?;
            println!("Logged out; {} removed.", settings.token_path.display());
        }
        Command::Status => {
            let status = authenticator.status().context("failed to read credential")?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }

    Ok(())
}

/// Logs go to stderr; stdout carries the protocol.
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn build_authenticator(args: &Args, settings: &Settings) -> anyhow::Result<GoogleAuthenticator> {
    let client = ClientConfig::from_file(&settings.client_secret_path).with_context(|| {
        format!(
            "could not load OAuth client secret from {} (download it from Google Cloud Console)",
            settings.client_secret_path.display()
        )
    })?;
    let provider = GoogleProvider::new(client)?;
    let store = FileCredentialStore::new(settings.token_path.clone());
    let consent = LoopbackConsent::new(args.consent_port, !args.no_browser);

    Ok(Authenticator::new(store, provider, consent, settings.integration.scopes()))
}
