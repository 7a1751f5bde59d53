//! MCP server for synthetic tabular data.
//!
//! Run with `mcp-server-datagen` or `mcp-server-datagen --seed 42` for reproducible output.

use clap::Parser;
use mcp_servers::{logging, DatagenAdapter, McpServer};

/// MCP server for synthetic tabular data.
///
/// Generates related tables from column schemas, with built-in insurance tables.
/// Communicates via JSON-RPC 2.0 over stdin/stdout.
#[derive(Parser)]
#[command(name = "mcp-server-datagen")]
#[command(version, about, long_about = None)]
struct Args {
    /// Seed for the random generator. Output is reproducible when set.
    #[arg(long)]
    seed: Option<u64>,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();
    logging::init(args.verbose);

    let mut server = McpServer::new(DatagenAdapter::new(args.seed));
    if let Err(e) = server.run().await {
        eprintln!("Error: Server error: {}", e);
        std::process::exit(1);
    }
}
