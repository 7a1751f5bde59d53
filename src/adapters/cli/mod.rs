//! Expose a clap command tree as MCP tools.
//!
//! Every command with at least one parameter becomes a tool named by its path,
//! e.g. `cli db init` → `cli-db-init`. Calls are turned back into argv, parsed
//! by clap and handed to a runner.

pub mod example;
pub mod params;

use async_trait::async_trait;
use clap::{ArgMatches, Command};
use serde_json::{Map, Value as JsonValue};

use crate::adapters::{Adapter, ToolDef};
use crate::error::{McpError, Result};

pub use params::{build_argv, ParamKind, ParamSpec};

/// Callback that executes a parsed command line and returns its output.
pub type Runner = Box<dyn Fn(&ArgMatches) -> Result<String> + Send + Sync>;

/// One command of the tree, as a tool.
#[derive(Debug, Clone)]
pub struct CommandTool {
    /// Tool name, the command path joined with `-`
    pub name: String,
    /// Command names from the root down
    pub path: Vec<String>,
    /// The command's `about`
    pub description: String,
    /// Parameters in declaration order
    pub params: Vec<ParamSpec>,
}

impl CommandTool {
    /// Tool definition with a schema derived from the parameters.
    pub fn tool_def(&self) -> ToolDef {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for param in &self.params {
            properties.insert(param.id.clone(), param.schema());
            if param.required {
                required.push(JsonValue::from(param.id.as_str()));
            }
        }
        ToolDef::new(
            &self.name,
            &self.description,
            serde_json::json!({
                "type": "object",
                "properties": properties,
                "required": required
            }),
        )
    }
}

/// Walk `command` depth first, collecting every command that takes parameters.
pub fn discover(command: &Command) -> Vec<CommandTool> {
    let mut tools = Vec::new();
    collect(command, &mut Vec::new(), &mut tools);
    tools
}

fn collect(command: &Command, path: &mut Vec<String>, tools: &mut Vec<CommandTool>) {
    path.push(command.get_name().to_string());

    let params: Vec<ParamSpec> = command
        .get_arguments()
        .filter_map(ParamSpec::from_arg)
        .collect();
    if !params.is_empty() {
        let description = command
            .get_about()
            .map(|a| a.to_string())
            .unwrap_or_else(|| format!("Run {}", path.join(" ")));
        tools.push(CommandTool {
            name: path.join("-"),
            path: path.clone(),
            description,
            params,
        });
    }

    for sub in command.get_subcommands() {
        collect(sub, path, tools);
    }
    path.pop();
}

/// Clap-backed server state.
pub struct CliAdapter {
    command: Command,
    tools: Vec<CommandTool>,
    runner: Runner,
}

impl CliAdapter {
    /// Wrap a command tree and the function that runs parsed invocations.
    pub fn new(command: Command, runner: Runner) -> Self {
        let tools = discover(&command);
        tracing::info!(
            "Exposing {} commands of '{}' as tools",
            tools.len(),
            command.get_name()
        );
        Self {
            command,
            tools,
            runner,
        }
    }

    /// Discovered command tools.
    pub fn command_tools(&self) -> &[CommandTool] {
        &self.tools
    }

    /// Parse and run one tool call.
    pub fn invoke(&self, name: &str, args: &Map<String, JsonValue>) -> Result<String> {
        let tool = self
            .tools
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| McpError::UnknownTool(name.to_string()))?;

        let argv = build_argv(&tool.path, &tool.params, args)?;
        tracing::debug!(?argv, "running command");

        let matches = self.command.clone().try_get_matches_from(argv)?;
        let output = (self.runner)(&matches)?;
        if output.trim().is_empty() {
            Ok("Command completed successfully".to_string())
        } else {
            Ok(output)
        }
    }
}

#[async_trait]
impl Adapter for CliAdapter {
    fn server_name(&self) -> &str {
        self.command.get_name()
    }

    fn tools(&self) -> Vec<ToolDef> {
        self.tools.iter().map(CommandTool::tool_def).collect()
    }

    async fn call_tool(&mut self, name: &str, args: Map<String, JsonValue>) -> Result<String> {
        self.invoke(name, &args)
    }
}
