//! MCP server for git repositories.
//!
//! Run with `mcp-server-git --repository /path/to/repo`.

use std::path::PathBuf;

use clap::Parser;
use mcp_servers::{logging, GitAdapter, McpServer};

/// MCP server for git repositories.
///
/// Exposes git status, diff, commit, branch and history operations as MCP tools.
/// Communicates via JSON-RPC 2.0 over stdin/stdout.
#[derive(Parser)]
#[command(name = "mcp-server-git")]
#[command(version, about, long_about = None)]
struct Args {
    /// Git repository path.
    /// Must be an existing repository.
    #[arg(short, long, value_name = "PATH")]
    repository: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();
    logging::init(args.verbose);

    let adapter = match GitAdapter::new(args.repository) {
        Ok(adapter) => adapter,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let mut server = McpServer::new(adapter);
    if let Err(e) = server.run().await {
        eprintln!("Error: Server error: {}", e);
        std::process::exit(1);
    }
}
