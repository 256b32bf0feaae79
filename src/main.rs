use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ftl_mcp::api::{self, SecurityConfig};
use ftl_mcp::client::ControlClient;
use ftl_mcp::{inventory, mcp, Context};

const DEFAULT_PORT: u16 = 17020;

#[derive(Parser)]
#[command(name = "ftl-mcp")]
#[command(about = "Inventory, session state and playbook synthesis for automation agents")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the REST API
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
    /// Start MCP server via stdio
    Mcp,
    /// Check a running server
    Status {
        /// API base URL (defaults to FTL_MCP_URL)
        #[arg(long)]
        url: Option<String>,
    },
    /// Parse an inventory file and print its group tree
    Check {
        path: PathBuf,
    },
}

/// Initialize tracing with output to stderr (for MCP mode) or stdout
fn init_tracing(use_stderr: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "ftl_mcp=debug,tower_http=debug".into()),
    );

    if use_stderr {
        // stdout carries the protocol
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn serve(port: u16) -> anyhow::Result<()> {
    let app = api::create_router_with_config(Context::new(), SecurityConfig::from_env());

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!("ftl-mcp listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn status(url: Option<String>) -> anyhow::Result<()> {
    let client = match url {
        Some(url) => ControlClient::new(url, std::env::var("FTL_MCP_API_KEY").ok()),
        None => ControlClient::from_env(),
    };

    let health = client
        .health()
        .await
        .with_context(|| format!("server at {} is not reachable", client.base_url()))?;
    println!("ftl-mcp {} at {}: {}", health.version, client.base_url(), health.status);

    let stats = client.stats().await?;
    let inventory = client.inventory_status().await?;
    match inventory.source {
        Some(source) => println!(
            "inventory: {} hosts in {} groups (from {})",
            inventory.host_count, inventory.group_count, source
        ),
        None => println!("inventory: not loaded"),
    }
    println!(
        "sessions: {} ({} activities), stored values: {}",
        stats.store.session_count, stats.store.total_activities, stats.store.generic_key_count
    );
    println!(
        "tasks: {} recorded, {} failed",
        stats.tasks.total_tasks, stats.tasks.failed
    );
    Ok(())
}

fn check(path: PathBuf) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let model = inventory::parse(&text).with_context(|| format!("{} is invalid", path.display()))?;

    println!(
        "{}: {} hosts, {} groups",
        path.display(),
        model.host_count(),
        model.group_count()
    );
    print!("{}", inventory::render_graph(&model));
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let use_stderr = matches!(cli.command, Some(Commands::Mcp));
    init_tracing(use_stderr);

    match cli.command {
        Some(Commands::Serve { port }) => serve(port).await,
        Some(Commands::Mcp) => mcp::run_stdio_server(Context::new()).await,
        Some(Commands::Status { url }) => status(url).await,
        Some(Commands::Check { path }) => check(path),
        None => serve(DEFAULT_PORT).await,
    }
}
