//! MCP server for SQLite databases.
//!
//! Run with `mcp-server-sqlite --db-path ~/analysis.db`.

use clap::Parser;
use mcp_servers::{logging, McpServer, SqliteAdapter};

/// MCP server for SQLite databases.
///
/// Exposes query tools, a business insights memo resource and a demo prompt.
/// Communicates via JSON-RPC 2.0 over stdin/stdout.
#[derive(Parser)]
#[command(name = "mcp-server-sqlite")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the SQLite database file.
    /// `~` is expanded and missing parent directories are created.
    #[arg(long, value_name = "PATH", default_value = "./sqlite_mcp_server.db")]
    db_path: String,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();
    logging::init(args.verbose);

    let adapter = match SqliteAdapter::open(&args.db_path) {
        Ok(adapter) => adapter,
        Err(e) => {
            eprintln!("Error: Failed to open database at '{}': {}", args.db_path, e);
            std::process::exit(1);
        }
    };

    let mut server = McpServer::new(adapter);
    if let Err(e) = server.run().await {
        eprintln!("Error: Server error: {}", e);
        std::process::exit(1);
    }
}
