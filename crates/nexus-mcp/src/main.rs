//! Nexus MCP host and client, entry point.

use std::time::Duration;

use clap::{Parser, Subcommand};

use nexus_mcp::config::load_config;
use nexus_mcp::types::{ClientCapabilities, InitializeResult};
use nexus_mcp::{HostSession, PeerSession};

#[derive(Parser)]
#[command(
    name = "nexus-mcp",
    about = "Model Context Protocol host and client",
    version
)]
struct Cli {
    /// Configuration file path.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a host on TCP, seeded from the configuration.
    Serve {
        /// Listen address; overrides `listen_addr` from the config.
        #[arg(long)]
        addr: Option<String>,

        /// Also serve the HTTP binding on this address (needs the `http` feature).
        #[arg(long)]
        http: Option<String>,
    },

    /// Print the server capability document and configured registry keys.
    Info,

    /// Connect to a host and list its tools.
    Tools {
        /// Host address.
        #[arg(long)]
        url: String,
    },

    /// Connect to a host and call one tool.
    Call {
        /// Host address.
        #[arg(long)]
        url: String,

        /// Tool name.
        #[arg(long)]
        name: String,

        /// Tool arguments as JSON.
        #[arg(long, default_value = "{}")]
        args: String,

        /// Give up after this many seconds.
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Serve { addr, http } => {
            let config = load_config(cli.config.as_deref())?;
            let host = HostSession::from_config(&config).await?;
            let addr = addr.unwrap_or_else(|| config.listen_addr.clone());

            let stopper = host.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    stopper.shutdown();
                }
            });

            if let Some(http_addr) = http {
                spawn_http(&host, http_addr);
            }

            host.listen(&addr).await?;
        }

        Commands::Info => {
            let config = load_config(cli.config.as_deref())?;
            let result = InitializeResult::default_result();
            let info = serde_json::json!({
                "server": result.server_info,
                "capabilities": result.capabilities,
                "tools": config.tools.iter().map(|t| &t.name).collect::<Vec<_>>(),
                "resources": config.resources.iter().map(|r| &r.uri).collect::<Vec<_>>(),
                "prompts": config.prompts.iter().map(|p| &p.name).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::Tools { url } => {
            let peer = PeerSession::connect(&url, ClientCapabilities::all()).await?;
            peer.initialize("").await?;
            let tools = peer.list_tools().await?;
            println!("{}", serde_json::to_string_pretty(&tools)?);
            peer.close().await;
        }

        Commands::Call {
            url,
            name,
            args,
            timeout_secs,
        } => {
            let arguments: serde_json::Value = serde_json::from_str(&args)?;
            let peer = PeerSession::connect(&url, ClientCapabilities::all()).await?;
            peer.initialize("").await?;
            let result = peer
                .call_tool_with_timeout(&name, arguments, Duration::from_secs(timeout_secs))
                .await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            peer.close().await;
        }
    }

    Ok(())
}

#[cfg(feature = "http")]
fn spawn_http(host: &HostSession, addr: String) {
    let transport = nexus_mcp::transport::HttpTransport::new(host.handler().clone());
    let shutdown = host.shutdown_token();
    tokio::spawn(async move {
        if let Err(e) = transport.run(&addr, shutdown).await {
            tracing::error!("HTTP transport failed: {e}");
        }
    });
}

#[cfg(not(feature = "http"))]
fn spawn_http(_host: &HostSession, addr: String) {
    tracing::warn!("Ignoring --http {addr}; built without the `http` feature");
}
