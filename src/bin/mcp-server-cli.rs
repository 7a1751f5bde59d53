//! MCP server exposing a clap command tree as tools.
//!
//! Run with `mcp-server-cli`, or `mcp-server-cli --list` to print the tools.

use clap::Parser;
use mcp_servers::adapters::cli::{discover, example};
use mcp_servers::{logging, CliAdapter, McpServer};

/// MCP server exposing a command-line tool.
///
/// Every subcommand that takes parameters becomes an MCP tool.
/// Communicates via JSON-RPC 2.0 over stdin/stdout.
#[derive(Parser)]
#[command(name = "mcp-server-cli")]
#[command(version, about, long_about = None)]
struct Args {
    /// Print the discovered tools to stderr and exit.
    #[arg(long)]
    list: bool,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();
    logging::init(args.verbose);

    let command = example::command();

    if args.list {
        for tool in discover(&command) {
            let params: Vec<&str> = tool.params.iter().map(|p| p.id.as_str()).collect();
            eprintln!("{}: {} ({})", tool.name, tool.description, params.join(", "));
        }
        return;
    }

    let mut server = McpServer::new(CliAdapter::new(command, Box::new(example::run)));
    if let Err(e) = server.run().await {
        eprintln!("Error: Server error: {}", e);
        std::process::exit(1);
    }
}
