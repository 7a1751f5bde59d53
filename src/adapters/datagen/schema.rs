//! Table schemas for synthetic data: column specs and the built-in insurance tables.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use crate::error::{McpError, Result};

fn default_kind() -> String {
    "string".to_string()
}

/// How to generate one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Basic type (`string`, `int`, `float`, ...) or a faker method name
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    /// `faker.<method>`, `mimesis.<category>.<method>`, or a library hint such as `numpy`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,
    /// Lower bound for numbers and ids
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Upper bound for numbers and ids
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Allowed values for categorical columns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<JsonValue>>,
    /// Foreign key into the table named after the column
    #[serde(default)]
    pub correlated: bool,
    /// Rendered in front of ids and category values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

/// Ordered column specs of one table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableSchema {
    columns: Vec<(String, ColumnSpec)>,
}

impl TableSchema {
    /// Parse a `{column: spec}` object, keeping column order.
    pub fn from_json(table: &str, value: &JsonValue) -> Result<Self> {
        let obj = value.as_object().ok_or_else(|| McpError::InvalidArg {
            name: "schemas".to_string(),
            reason: format!("schema for table {} must be an object", table),
        })?;

        let columns = obj
            .iter()
            .map(|(name, spec)| {
                serde_json::from_value::<ColumnSpec>(spec.clone())
                    .map(|spec| (name.clone(), spec))
                    .map_err(|e| McpError::InvalidArg {
                        name: "schemas".to_string(),
                        reason: format!("column {}.{}: {}", table, name, e),
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { columns })
    }

    /// Columns in declaration order.
    pub fn columns(&self) -> &[(String, ColumnSpec)] {
        &self.columns
    }
}

/// Table referenced by a foreign key column: `policy_id` → `policies`.
pub fn parent_table(column: &str) -> Result<String> {
    let stem = column
        .strip_suffix("_id")
        .ok_or_else(|| McpError::Generation(format!("Column {} is not a foreign key", column)))?;

    Ok(match stem {
        "policy" => "policies".to_string(),
        "company" => "companies".to_string(),
        "category" => "categories".to_string(),
        s if s.ends_with('s') => s.to_string(),
        s => format!("{}s", s),
    })
}

/// Names of the built-in schemas, in generation order.
pub const DEFAULT_TABLES: [&str; 3] = ["customers", "policies", "claims"];

/// Built-in insurance schema for `table`, if there is one.
pub fn default_schema(table: &str) -> Option<TableSchema> {
    let value = match table {
        "customers" => json!({
            "customer_id": {"type": "int", "generator": "numpy", "min": 10000, "max": 99999},
            "first_name": {"type": "first_name", "generator": "faker"},
            "last_name": {"type": "last_name", "generator": "faker"},
            "email": {"type": "email", "generator": "faker"},
            "phone": {"type": "phone_number", "generator": "faker"},
            "address": {"type": "address", "generator": "faker"},
            "age": {"type": "int", "min": 18, "max": 100},
            "credit_score": {"type": "int", "min": 300, "max": 850},
            "active": {"type": "boolean"}
        }),
        "policies" => json!({
            "policy_id": {
                "type": "integer", "generator": "numpy",
                "min": 100000, "max": 999999, "prefix": "POL-2024-"
            },
            "customer_id": {"type": "int", "min": 10000, "max": 99999, "correlated": true},
            "policy_type": {"type": "category", "categories": ["Auto", "Home", "Life", "Health"]},
            "start_date": {"type": "date_this_year", "generator": "faker"},
            "premium": {"type": "float", "min": 500.0, "max": 5000.0},
            "deductible": {"type": "float", "min": 250.0, "max": 2000.0},
            "coverage_amount": {"type": "int", "min": 50000, "max": 1000000},
            "risk_score": {"type": "int", "min": 1, "max": 100},
            "status": {"type": "category", "categories": ["Active", "Pending", "Expired", "Cancelled"]}
        }),
        "claims" => json!({
            "claim_id": {"type": "int", "min": 100000, "max": 999999},
            "policy_id": {
                "type": "integer", "generator": "numpy",
                "min": 100000, "max": 999999, "prefix": "POL-2024-", "correlated": true
            },
            "date_filed": {"type": "date_this_year", "generator": "faker"},
            "amount": {"type": "float", "min": 100.0, "max": 50000.0},
            "status": {"type": "category", "categories": ["Filed", "Under Review", "Approved", "Denied"]},
            "description": {"type": "text", "generator": "faker"}
        }),
        _ => return None,
    };
    TableSchema::from_json(table, &value).ok()
}
