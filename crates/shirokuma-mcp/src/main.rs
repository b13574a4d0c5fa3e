//! Shirokuma MCP server - knowledge base for AI agents.
//!
//! Exposes the item store, enrichment pipeline, structured search, hybrid
//! related-item engine, and system-state continuity record as MCP tools
//! over JSON-RPC 2.0 on stdio.
//!
//! Environment:
//! - `SHIROKUMA_DATABASE_URL` - `file:<path>` locating the embedded database
//! - `SHIROKUMA_DATA_DIR` - base data directory when the URL is unset
//! - `SHIROKUMA_EXPORT_DIR` - enables the Markdown file mirror
//! - `RUST_LOG` - log filter (logs go to stderr; stdout is protocol-only)

mod protocol;
mod server;
mod tools;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use shirokuma_core::{Config, Store};

use crate::protocol::stdio::StdioTransport;
use crate::server::McpServer;

/// Parse command-line arguments, returning the optional data directory.
/// Exits the process for `--help` / `--version`.
fn parse_args() -> Option<PathBuf> {
    let args: Vec<String> = std::env::args().collect();
    let mut data_dir: Option<PathBuf> = None;
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                println!("Shirokuma MCP Server v{}", env!("CARGO_PKG_VERSION"));
                println!();
                println!("Knowledge-base MCP server over stdio JSON-RPC.");
                println!();
                println!("USAGE:");
                println!("    shirokuma-mcp [OPTIONS]");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help              Print help information");
                println!("    -V, --version           Print version information");
                println!("    --data-dir <PATH>       Custom data directory");
                println!();
                println!("ENVIRONMENT:");
                println!("    SHIROKUMA_DATABASE_URL  file:<path> for the embedded database");
                println!("    SHIROKUMA_DATA_DIR      Base data directory");
                println!("    SHIROKUMA_EXPORT_DIR    Enables the Markdown file mirror");
                println!("    SHIROKUMA_AUTO_MIGRATE  Set 0/false to skip migrations at start");
                println!("    RUST_LOG                Log level filter (debug, info, warn, error)");
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("shirokuma-mcp {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--data-dir" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --data-dir requires a path argument");
                    std::process::exit(1);
                }
                data_dir = Some(PathBuf::from(&args[i]));
            }
            arg if arg.starts_with("--data-dir=") => {
                let path = arg.strip_prefix("--data-dir=").unwrap_or("");
                if path.is_empty() {
                    eprintln!("error: --data-dir requires a path argument");
                    std::process::exit(1);
                }
                data_dir = Some(PathBuf::from(path));
            }
            arg => {
                eprintln!("error: unknown argument '{arg}'");
                eprintln!("Try 'shirokuma-mcp --help' for more information.");
                std::process::exit(1);
            }
        }
        i += 1;
    }

    data_dir
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = parse_args();

    // stdout carries JSON-RPC frames; all logging goes to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let config = match data_dir {
        Some(dir) => Config::with_data_dir(dir),
        None => Config::from_env(),
    }
    .map_err(|e| anyhow::anyhow!("configuration error: {e}"))?;

    info!(
        "opening knowledge base at {} (mirror: {})",
        config.database_path.display(),
        config
            .export_dir
            .as_ref()
            .map(|d| d.display().to_string())
            .unwrap_or_else(|| "disabled".to_string())
    );

    let store = match Store::open(&config) {
        Ok(store) => Arc::new(store),
        Err(err) => {
            error!("failed to open store: {err}");
            return Err(anyhow::anyhow!(err));
        }
    };

    info!("shirokuma-mcp v{} ready on stdio", env!("CARGO_PKG_VERSION"));
    StdioTransport::new().run(McpServer::new(store)).await?;
    Ok(())
}
