use anyhow::Result;
use caselink_core::CaseApi;
use chrono::Utc;
use clap::Parser;
use rmcp::transport::stdio;
use rmcp::ServiceExt;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod tools;

use tools::CaselinkService;

/// MCP server for case-management lookups and bounded document reading.
#[derive(Parser)]
#[command(name = "caselink-mcp", version)]
struct Cli {
    /// Base URL of the case-management REST API
    #[arg(long, env = "CASELINK_API_BASE_URL")]
    api_base_url: String,

    /// Bearer token for the case-management REST API
    #[arg(long, env = "CASELINK_API_TOKEN", hide_env_values = true)]
    api_token: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the MCP protocol; all logging goes to stderr.
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let api = CaseApi::new(&cli.api_base_url, cli.api_token)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        "caselink-mcp boot"
    );

    let service = CaselinkService::new(api);
    let server = service.serve(stdio()).await?;
    server.waiting().await?;

    info!("caselink-mcp stopped");
    Ok(())
}
