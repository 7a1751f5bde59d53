//! Synthetic tabular data generation.
//!
//! Tools: generate_custom_tables, generate_insurance_data

pub mod faker;
pub mod schema;
pub mod synthetic;

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{json, Map, Value as JsonValue};

use crate::adapters::{Adapter, ToolDef};
use crate::args::{get_optional_i64, get_optional_object, get_string_array_arg};
use crate::error::{McpError, Result};

pub use schema::{default_schema, parent_table, ColumnSpec, TableSchema, DEFAULT_TABLES};
pub use synthetic::{SyntheticGenerator, TableData};

const DEFAULT_ROWS: i64 = 1000;

const CUSTOM_TABLES_DESCRIPTION: &str = r#"Generate synthetic data tables with custom schemas.

Each column spec has a "type" and optional "generator", "min", "max", "categories", "correlated" and "prefix".
- Basic types: string, int/integer, float, boolean, datetime, category
- Faker types: first_name, last_name, email, phone_number, address, date_of_birth, date_this_year, date_this_decade, text
- Generators: "faker.<method>" or "mimesis.<category>.<method>"
- Columns ending in _id get unique ids in [min, max]
- "correlated": true makes <name>_id reference ids generated for table <name>s
- "prefix" is prepended to ids and category values, e.g. "POL-"

Default schemas are available for customers, policies and claims."#;

const INSURANCE_DESCRIPTION: &str = r#"Generate insurance-related data tables using default schemas.

Generates customers, policies and claims. Policies reference customers through customer_id and
claims reference policies through policy_id (prefixed "POL-2024-"). All tables keep referential integrity."#;

fn rows_arg(args: &Map<String, JsonValue>, default: Option<i64>) -> Result<usize> {
    let rows = match (get_optional_i64(args, "rows")?, default) {
        (Some(rows), _) => rows,
        (None, Some(default)) => default,
        (None, None) => return Err(McpError::MissingArg("rows".to_string())),
    };
    if rows <= 0 {
        return Err(McpError::Generation("Row count must be positive".to_string()));
    }
    Ok(rows as usize)
}

/// Generation order: the insurance tables first, then everything else as requested.
fn ordered(tables: &[String]) -> Vec<String> {
    let mut ordered = tables.to_vec();
    ordered.sort_by_key(|t| {
        DEFAULT_TABLES
            .iter()
            .position(|d| d == t)
            .unwrap_or(DEFAULT_TABLES.len())
    });
    ordered
}

/// Datagen server state.
pub struct DatagenAdapter {
    generator: SyntheticGenerator,
}

impl DatagenAdapter {
    /// Create the adapter; a seed makes every call reproducible from startup.
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            generator: SyntheticGenerator::new(seed),
        }
    }

    /// Wrap a preconfigured generator.
    pub fn with_generator(generator: SyntheticGenerator) -> Self {
        Self { generator }
    }

    /// Generate `tables` with `rows` rows each.
    ///
    /// Schemas come from `custom` first, then the defaults. Parents missing from the
    /// request are resolved the same way but left out of the result.
    pub fn generate_tables(
        &mut self,
        tables: &[String],
        rows: usize,
        custom: &HashMap<String, TableSchema>,
    ) -> Result<Map<String, JsonValue>> {
        let mut schemas = HashMap::new();
        for table in tables {
            let schema = custom
                .get(table)
                .cloned()
                .or_else(|| default_schema(table))
                .ok_or_else(|| {
                    McpError::Generation(format!("No schema found for table {}", table))
                })?;
            schemas.insert(table.clone(), schema);
        }

        self.generator.reset();

        let lookup = |name: &str| custom.get(name).cloned().or_else(|| default_schema(name));
        let mut result = Map::new();
        for table in ordered(tables) {
            let Some(schema) = schemas.get(&table) else {
                continue;
            };
            tracing::info!("Generating {} rows for table {}", rows, table);
            let data = self
                .generator
                .generate_table(&table, schema, rows, &lookup)
                .map_err(|e| {
                    McpError::Generation(format!("Failed to generate table {}: {}", table, e))
                })?;
            result.insert(table, JsonValue::Object(data));
        }
        Ok(result)
    }
}

fn parse_custom_schemas(args: &Map<String, JsonValue>) -> Result<HashMap<String, TableSchema>> {
    let Some(obj) = get_optional_object(args, "schemas")? else {
        return Ok(HashMap::new());
    };
    obj.iter()
        .map(|(table, value)| Ok((table.clone(), TableSchema::from_json(table, value)?)))
        .collect()
}

/// Get all datagen tool definitions.
pub fn tools() -> Vec<ToolDef> {
    vec![
        ToolDef::new(
            "generate_custom_tables",
            CUSTOM_TABLES_DESCRIPTION,
            json!({
                "type": "object",
                "properties": {
                    "tables": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "List of table names to generate. Use default schemas or provide custom schemas."
                    },
                    "rows": {
                        "type": "integer",
                        "minimum": 1,
                        "description": "Number of rows to generate for each table. Default: 1000"
                    },
                    "schemas": {
                        "type": "object",
                        "description": "Custom schema definitions for tables. Optional if using default schemas.",
                        "additionalProperties": {
                            "type": "object",
                            "description": "Schema definition for a single table",
                            "additionalProperties": {
                                "type": "object",
                                "description": "Column definition",
                                "properties": {
                                    "type": {"type": "string"},
                                    "generator": {"type": "string"},
                                    "min": {"type": "number"},
                                    "max": {"type": "number"},
                                    "categories": {"type": "array", "items": {"type": "string"}},
                                    "correlated": {"type": "boolean"},
                                    "prefix": {"type": "string"}
                                }
                            }
                        }
                    }
                },
                "required": ["tables"]
            }),
        ),
        ToolDef::new(
            "generate_insurance_data",
            INSURANCE_DESCRIPTION,
            json!({
                "type": "object",
                "properties": {
                    "rows": {
                        "type": "integer",
                        "minimum": 1,
                        "description": "Number of rows to generate for each table"
                    }
                },
                "required": ["rows"]
            }),
        ),
    ]
}

#[async_trait]
impl Adapter for DatagenAdapter {
    fn server_name(&self) -> &str {
        "mcp-datagen"
    }

    fn tools(&self) -> Vec<ToolDef> {
        tools()
    }

    async fn call_tool(&mut self, name: &str, args: Map<String, JsonValue>) -> Result<String> {
        let tables = match name {
            "generate_custom_tables" => {
                let tables = get_string_array_arg(&args, "tables")?;
                let rows = rows_arg(&args, Some(DEFAULT_ROWS))?;
                let custom = parse_custom_schemas(&args)?;
                self.generate_tables(&tables, rows, &custom)?
            }
            "generate_insurance_data" => {
                let rows = rows_arg(&args, None)?;
                let tables: Vec<String> = DEFAULT_TABLES.iter().map(|t| t.to_string()).collect();
                self.generate_tables(&tables, rows, &HashMap::new())?
            }
            _ => return Err(McpError::UnknownTool(name.to_string())),
        };
        Ok(serde_json::to_string_pretty(&json!({ "tables": tables }))?)
    }
}
