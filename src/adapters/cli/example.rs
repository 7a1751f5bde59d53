//! Example command tree served by `mcp-server-cli`.
//!
//! ```text
//! cli db init --name <NAME> [--port <PORT>]
//! cli db drop [--force] <NAMES>...
//! cli users greet [--count <N>] [--greeting Hello|Hi|Hey] <NAME>
//! ```

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};

use crate::error::{McpError, Result};

/// Build the example command tree.
pub fn command() -> Command {
    Command::new("cli")
        .about("Example command-line tool")
        .subcommand_required(true)
        .subcommand(
            Command::new("db")
                .about("Database commands")
                .subcommand_required(true)
                .subcommand(
                    Command::new("init")
                        .about("Initialize a database")
                        .arg(
                            Arg::new("name")
                                .long("name")
                                .required(true)
                                .help("Database name"),
                        )
                        .arg(
                            Arg::new("port")
                                .long("port")
                                .value_parser(value_parser!(u16))
                                .default_value("5432")
                                .help("Port number"),
                        ),
                )
                .subcommand(
                    Command::new("drop")
                        .about("Drop one or more databases")
                        .arg(
                            Arg::new("names")
                                .num_args(1..)
                                .required(true)
                                .help("Databases to drop"),
                        )
                        .arg(
                            Arg::new("force")
                                .long("force")
                                .action(ArgAction::SetTrue)
                                .help("Drop without confirmation"),
                        ),
                ),
        )
        .subcommand(
            Command::new("users")
                .about("User commands")
                .subcommand_required(true)
                .subcommand(
                    Command::new("greet")
                        .about("Greet a user")
                        .arg(Arg::new("name").required(true).help("Name to greet"))
                        .arg(
                            Arg::new("count")
                                .long("count")
                                .value_parser(value_parser!(u32))
                                .default_value("1")
                                .help("Number of greetings"),
                        )
                        .arg(
                            Arg::new("greeting")
                                .long("greeting")
                                .value_parser(["Hello", "Hi", "Hey"])
                                .default_value("Hello")
                                .help("Greeting to use"),
                        ),
                ),
        )
}

fn required<'a>(matches: &'a ArgMatches, id: &str) -> Result<&'a String> {
    matches
        .get_one::<String>(id)
        .ok_or_else(|| McpError::Command(format!("missing value for '{}'", id)))
}

/// Execute a parsed invocation of [`command`].
pub fn run(matches: &ArgMatches) -> Result<String> {
    match matches.subcommand() {
        Some(("db", db)) => match db.subcommand() {
            Some(("init", m)) => {
                let name = required(m, "name")?;
                let port = m.get_one::<u16>("port").copied().unwrap_or(5432);
                Ok(format!("Initialized database '{}' on port {}", name, port))
            }
            Some(("drop", m)) => {
                let names: Vec<&str> = m
                    .get_many::<String>("names")
                    .map(|v| v.map(String::as_str).collect())
                    .unwrap_or_default();
                if m.get_flag("force") {
                    Ok(format!("Dropped {}", names.join(", ")))
                } else {
                    Ok(format!(
                        "Would drop {}; pass force to confirm",
                        names.join(", ")
                    ))
                }
            }
            _ => Err(McpError::Command("unknown db command".to_string())),
        },
        Some(("users", users)) => match users.subcommand() {
            Some(("greet", m)) => {
                let name = required(m, "name")?;
                let greeting = required(m, "greeting")?;
                let count = m.get_one::<u32>("count").copied().unwrap_or(1);
                Ok((0..count)
                    .map(|_| format!("{}, {}!", greeting, name))
                    .collect::<Vec<_>>()
                    .join("\n"))
            }
            _ => Err(McpError::Command("unknown users command".to_string())),
        },
        _ => Err(McpError::Command("unknown command".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_tree_is_valid() {
        command().debug_assert();
    }

    #[test]
    fn test_run_greet() {
        let matches = command()
            .try_get_matches_from(["cli", "users", "greet", "--count", "2", "Ada"])
            .unwrap();
        assert_eq!(run(&matches).unwrap(), "Hello, Ada!\nHello, Ada!");
    }
}
