//! Logging setup shared by every server binary.
//!
//! stdout carries the protocol, so all diagnostics go to stderr.

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Map a `-v` count to a level for this crate.
pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    }
}

/// Install a stderr subscriber. `RUST_LOG` directives are applied on top.
pub fn init(verbosity: u8) {
    let directive = format!(
        "mcp_servers={}",
        level_for(verbosity).to_string().to_lowercase()
    );
    let filter = match directive.parse() {
        Ok(d) => EnvFilter::from_default_env().add_directive(d),
        Err(_) => EnvFilter::from_default_env(),
    };

    // A second init (e.g. from tests) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}
