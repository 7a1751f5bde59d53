//! MCP server for Sentry issues.
//!
//! Run with `mcp-server-sentry --auth-token <TOKEN>` or with `SENTRY_TOKEN` set.

use clap::Parser;
use mcp_servers::adapters::sentry::SENTRY_API_BASE;
use mcp_servers::{logging, McpServer, SentryAdapter};

/// MCP server for Sentry issues.
///
/// Retrieves issues and their latest stacktraces from the Sentry API.
/// Communicates via JSON-RPC 2.0 over stdin/stdout.
#[derive(Parser)]
#[command(name = "mcp-server-sentry")]
#[command(version, about, long_about = None)]
struct Args {
    /// Sentry authentication token.
    #[arg(long, env = "SENTRY_TOKEN", hide_env_values = true)]
    auth_token: String,

    /// Base URL of the Sentry API.
    #[arg(long, value_name = "URL", default_value = SENTRY_API_BASE)]
    api_base: String,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();
    logging::init(args.verbose);

    if args.auth_token.trim().is_empty() {
        eprintln!("Error: Sentry authentication token not found. Please specify your Sentry auth token.");
        std::process::exit(1);
    }

    let adapter = match SentryAdapter::new(args.auth_token, &args.api_base) {
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
