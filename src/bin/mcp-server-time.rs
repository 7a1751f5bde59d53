//! MCP server for time and timezone conversion.
//!
//! Run with `mcp-server-time` or `mcp-server-time --local-timezone Europe/Warsaw`.

use clap::Parser;
use mcp_servers::{logging, McpServer, TimeAdapter};

/// MCP server for time and timezone conversion.
///
/// Reports the current time in any IANA zone and converts times between zones.
/// Communicates via JSON-RPC 2.0 over stdin/stdout.
#[derive(Parser)]
#[command(name = "mcp-server-time")]
#[command(version, about, long_about = None)]
struct Args {
    /// Override the detected local timezone (IANA name).
    #[arg(long, value_name = "TZ")]
    local_timezone: Option<String>,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();
    logging::init(args.verbose);

    let adapter = match TimeAdapter::new(args.local_timezone.as_deref()) {
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
