//! MCP server for fetching web content.
//!
//! Run with `mcp-server-fetch` or `mcp-server-fetch --ignore-robots-txt`.

use clap::Parser;
use mcp_servers::{logging, FetchAdapter, McpServer};

/// MCP server for fetching web content.
///
/// Fetches URLs, honoring robots.txt, and converts HTML pages to markdown.
/// Communicates via JSON-RPC 2.0 over stdin/stdout.
#[derive(Parser)]
#[command(name = "mcp-server-fetch")]
#[command(version, about, long_about = None)]
struct Args {
    /// Custom User-Agent string for every request.
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,

    /// Ignore robots.txt restrictions.
    #[arg(long)]
    ignore_robots_txt: bool,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();
    logging::init(args.verbose);

    let adapter = match FetchAdapter::new(args.user_agent, args.ignore_robots_txt) {
        Ok(adapter) => adapter,
        Err(e) => {
            eprintln!("Error: Failed to create HTTP client: {}", e);
            std::process::exit(1);
        }
    };

    let mut server = McpServer::new(adapter);
    if let Err(e) = server.run().await {
        eprintln!("Error: Server error: {}", e);
        std::process::exit(1);
    }
}
