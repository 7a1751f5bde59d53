//! Row generation with unique ids and foreign keys between tables.

use std::collections::{HashMap, HashSet};

use chrono::{NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_json::{Map, Value as JsonValue};

use super::faker;
use super::schema::{parent_table, ColumnSpec, TableSchema};
use crate::error::{McpError, Result};

/// Generated table: column name to values, in schema order.
pub type TableData = Map<String, JsonValue>;

const DEFAULT_ID_MIN: i64 = 1;
const DEFAULT_ID_MAX: i64 = 1_000_000;
const ID_ATTEMPTS_PER_WINDOW: usize = 10;

/// Ids handed out for one table, in generation order.
#[derive(Debug, Default)]
struct IdPool {
    seen: HashSet<i64>,
    order: Vec<i64>,
}

impl IdPool {
    fn insert(&mut self, id: i64) -> bool {
        if self.seen.insert(id) {
            self.order.push(id);
            true
        } else {
            false
        }
    }
}

fn render_id(id: i64, prefix: Option<&str>) -> JsonValue {
    match prefix {
        Some(p) => JsonValue::String(format!("{}{}", p, id)),
        None => JsonValue::from(id),
    }
}

fn render_category(value: &JsonValue, prefix: Option<&str>) -> JsonValue {
    match (prefix, value) {
        (Some(p), JsonValue::String(s)) => JsonValue::String(format!("{}{}", p, s)),
        (Some(p), other) => JsonValue::String(format!("{}{}", p, other)),
        (None, other) => other.clone(),
    }
}

/// Synthetic data generator.
///
/// Keeps the ids generated per table so later tables can reference them.
pub struct SyntheticGenerator {
    rng: StdRng,
    generated_ids: HashMap<String, IdPool>,
    id_counters: HashMap<String, i64>,
    today: NaiveDate,
}

impl SyntheticGenerator {
    /// Create a generator, deterministic when `seed` is given.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            generated_ids: HashMap::new(),
            id_counters: HashMap::new(),
            today: Utc::now().date_naive(),
        }
    }

    /// Pin the reference date used for relative dates.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Forget all generated ids.
    pub fn reset(&mut self) {
        self.generated_ids.clear();
        self.id_counters.clear();
    }

    /// Ids generated so far for `table`, in generation order.
    pub fn ids_for(&self, table: &str) -> &[i64] {
        self.generated_ids
            .get(table)
            .map(|p| p.order.as_slice())
            .unwrap_or_default()
    }

    /// Generate `rows` rows of `table`.
    ///
    /// Parent tables referenced by correlated columns are generated first when no
    /// ids exist for them yet, using `lookup` to find their schema. Their rows are
    /// discarded; only their ids are kept.
    pub fn generate_table(
        &mut self,
        table: &str,
        schema: &TableSchema,
        rows: usize,
        lookup: &dyn Fn(&str) -> Option<TableSchema>,
    ) -> Result<TableData> {
        let mut stack = Vec::new();
        self.generate_inner(table, schema, rows, lookup, &mut stack)
    }

    fn generate_inner(
        &mut self,
        table: &str,
        schema: &TableSchema,
        rows: usize,
        lookup: &dyn Fn(&str) -> Option<TableSchema>,
        stack: &mut Vec<String>,
    ) -> Result<TableData> {
        stack.push(table.to_string());

        for (column, spec) in schema.columns() {
            if !spec.correlated {
                continue;
            }
            let parent = parent_table(column)?;
            if !self.ids_for(&parent).is_empty() {
                continue;
            }
            if stack.contains(&parent) {
                return Err(McpError::Generation(format!(
                    "Circular reference between tables: {} -> {}",
                    stack.join(" -> "),
                    parent
                )));
            }
            let parent_schema = lookup(&parent).ok_or_else(|| {
                McpError::Generation(format!("Parent table {} schema not found", parent))
            })?;
            tracing::debug!("Generating parent table {} for {}", parent, table);
            self.generate_inner(&parent, &parent_schema, rows, lookup, stack)?;
        }

        let mut columns: Vec<Vec<JsonValue>> =
            vec![Vec::with_capacity(rows); schema.columns().len()];
        for _ in 0..rows {
            for (i, (name, spec)) in schema.columns().iter().enumerate() {
                let value = self.column_value(table, name, spec)?;
                columns[i].push(value);
            }
        }

        stack.pop();

        let mut data = TableData::new();
        for ((name, _), values) in schema.columns().iter().zip(columns) {
            data.insert(name.clone(), JsonValue::Array(values));
        }
        Ok(data)
    }

    fn column_value(&mut self, table: &str, name: &str, spec: &ColumnSpec) -> Result<JsonValue> {
        let prefix = spec.prefix.as_deref();

        if name.ends_with("_id") && !spec.correlated {
            let id = self.unique_id(table, spec)?;
            return Ok(render_id(id, prefix));
        }
        if spec.correlated {
            let id = self.correlated_id(&parent_table(name)?)?;
            return Ok(render_id(id, prefix));
        }

        let generator = spec.generator.as_deref().filter(|g| faker::is_library_generator(g));
        match spec.kind.as_str() {
            "string" => {
                if let Some(g) = generator {
                    return Ok(faker::from_generator(g, &mut self.rng, self.today)
                        .unwrap_or(JsonValue::Null));
                }
                if let Some(categories) = spec.categories.as_deref().filter(|c| !c.is_empty()) {
                    return Ok(self.pick_category(categories, prefix));
                }
                Ok(faker::generate("word", &mut self.rng, self.today).unwrap_or(JsonValue::Null))
            }
            "int" | "integer" => {
                let min = spec.min.map_or(0, |v| v.round() as i64);
                let max = spec.max.map_or(100, |v| v.round() as i64);
                if min > max {
                    return Err(McpError::Generation(format!(
                        "Column {} has min {} greater than max {}",
                        name, min, max
                    )));
                }
                Ok(JsonValue::from(self.rng.gen_range(min..=max)))
            }
            "float" => {
                let min = spec.min.unwrap_or(0.0);
                let max = spec.max.unwrap_or(1.0);
                if min > max {
                    return Err(McpError::Generation(format!(
                        "Column {} has min {} greater than max {}",
                        name, min, max
                    )));
                }
                if !(max - min).is_finite() {
                    return Err(McpError::Generation(format!(
                        "Column {} range {}..{} is too wide to sample",
                        name, min, max
                    )));
                }
                let value = if min == max { min } else { self.rng.gen_range(min..max) };
                Ok(JsonValue::from(value))
            }
            "datetime" => {
                let method = generator.unwrap_or("faker.date_time_this_decade");
                Ok(faker::from_generator(method, &mut self.rng, self.today)
                    .unwrap_or(JsonValue::Null))
            }
            "category" => {
                let categories = spec
                    .categories
                    .as_deref()
                    .filter(|c| !c.is_empty())
                    .ok_or_else(|| {
                        McpError::Generation(format!(
                            "Column {} of type category requires categories",
                            name
                        ))
                    })?;
                Ok(self.pick_category(categories, prefix))
            }
            "boolean" | "bool" => Ok(JsonValue::Bool(self.rng.gen())),
            other => {
                Ok(faker::generate(other, &mut self.rng, self.today).unwrap_or(JsonValue::Null))
            }
        }
    }

    fn pick_category(&mut self, categories: &[JsonValue], prefix: Option<&str>) -> JsonValue {
        categories
            .choose(&mut self.rng)
            .map(|c| render_category(c, prefix))
            .unwrap_or(JsonValue::Null)
    }

    fn correlated_id(&mut self, parent: &str) -> Result<i64> {
        let pool = self.generated_ids.get(parent).map(|p| p.order.as_slice()).unwrap_or_default();
        pool.choose(&mut self.rng).copied().ok_or_else(|| {
            McpError::Generation(format!("No IDs available for parent table {}", parent))
        })
    }

    /// Unique id in `[min, max]`, walking the range in windows of 0.1% and
    /// picking a random offset inside the current window.
    fn unique_id(&mut self, table: &str, spec: &ColumnSpec) -> Result<i64> {
        let min = spec.min.map_or(DEFAULT_ID_MIN, |v| v.round() as i64);
        let max = spec.max.map_or(DEFAULT_ID_MAX, |v| v.round() as i64);
        // i128 so that spans wider than i64::MAX stay exact
        let range = i128::from(max) - i128::from(min) + 1;
        if range <= 0 {
            return Err(McpError::Generation(format!(
                "Invalid id range {}..{} for table {}",
                min, max, table
            )));
        }

        let pool = self.generated_ids.entry(table.to_string()).or_default();
        if pool.seen.len() as i128 >= range {
            return Err(McpError::Generation(format!(
                "ID range {}..{} exhausted for table {}",
                min, max, table
            )));
        }

        let window = (range / 1000).max(1);
        let counter = self.id_counters.entry(table.to_string()).or_insert(0);
        loop {
            for _ in 0..ID_ATTEMPTS_PER_WINDOW {
                let offset = self.rng.gen_range(0..window);
                let mut id = i128::from(min) + i128::from(*counter) * window + offset;
                if id > i128::from(max) {
                    *counter = 0;
                    id = i128::from(min) + offset;
                }
                let id = i64::try_from(id).map_err(|_| {
                    McpError::Generation(format!(
                        "Invalid id range {}..{} for table {}",
                        min, max, table
                    ))
                })?;
                if pool.insert(id) {
                    *counter += 1;
                    return Ok(id);
                }
            }
            *counter += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema(value: JsonValue) -> TableSchema {
        TableSchema::from_json("t", &value).unwrap()
    }

    fn no_lookup(_: &str) -> Option<TableSchema> {
        None
    }

    #[test]
    fn test_unique_ids_fill_small_range() {
        let mut gen = SyntheticGenerator::new(Some(42));
        let s = schema(json!({"item_id": {"type": "int", "min": 1, "max": 50}}));
        let data = gen.generate_table("items", &s, 50, &no_lookup).unwrap();
        let ids: HashSet<i64> = data["item_id"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_i64().unwrap())
            .collect();
        assert_eq!(ids.len(), 50);
        assert!(ids.iter().all(|id| (1..=50).contains(id)));
    }

    #[test]
    fn test_exhausted_range_is_an_error() {
        let mut gen = SyntheticGenerator::new(Some(1));
        let s = schema(json!({"item_id": {"type": "int", "min": 1, "max": 5}}));
        let err = gen.generate_table("items", &s, 6, &no_lookup).unwrap_err();
        assert!(err.to_string().contains("exhausted"));
    }

    #[test]
    fn test_full_width_id_range() {
        let mut gen = SyntheticGenerator::new(Some(3));
        let s = schema(json!({"row_id": {"type": "int", "min": -9e18, "max": 9e18}}));
        let data = gen.generate_table("rows", &s, 20, &no_lookup).unwrap();
        let ids: HashSet<i64> = data["row_id"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_i64().unwrap())
            .collect();
        assert_eq!(ids.len(), 20);
        assert!(ids
            .iter()
            .all(|id| (-9_000_000_000_000_000_000..=9_000_000_000_000_000_000).contains(id)));
    }

    #[test]
    fn test_unsampleable_float_range_is_an_error() {
        let mut gen = SyntheticGenerator::new(Some(3));
        let s = schema(json!({"weight": {"type": "float", "min": -1e308, "max": 1e308}}));
        let err = gen.generate_table("t", &s, 1, &no_lookup).unwrap_err();
        assert!(matches!(err, McpError::Generation(_)));
        assert!(err.to_string().contains("too wide"));
    }

    #[test]
    fn test_prefixed_foreign_keys_match_parent() {
        let mut gen = SyntheticGenerator::new(Some(5));
        let parent = schema(json!({
            "order_id": {"type": "int", "min": 1, "max": 1000, "prefix": "ORD-"}
        }));
        let child = schema(json!({
            "line_id": {"type": "int"},
            "order_id": {"type": "int", "prefix": "ORD-", "correlated": true}
        }));
        let orders = gen.generate_table("orders", &parent, 20, &no_lookup).unwrap();
        let lines = gen.generate_table("lines", &child, 40, &no_lookup).unwrap();

        let parent_ids: HashSet<&str> = orders["order_id"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        for fk in lines["order_id"].as_array().unwrap() {
            let fk = fk.as_str().unwrap();
            assert!(fk.starts_with("ORD-"));
            assert!(parent_ids.contains(fk));
        }
    }

    #[test]
    fn test_missing_parent_schema() {
        let mut gen = SyntheticGenerator::new(Some(2));
        let child = schema(json!({"vendor_id": {"type": "int", "correlated": true}}));
        let err = gen.generate_table("invoices", &child, 3, &no_lookup).unwrap_err();
        assert_eq!(err.to_string(), "Parent table vendors schema not found");
    }

    #[test]
    fn test_self_reference_is_rejected() {
        let mut gen = SyntheticGenerator::new(Some(2));
        let nodes = schema(json!({"node_id": {"type": "int", "correlated": true}}));
        let lookup = |name: &str| (name == "nodes").then(|| nodes.clone());
        let err = gen.generate_table("nodes", &nodes, 3, &lookup).unwrap_err();
        assert!(err.to_string().contains("Circular reference"));
    }

    #[test]
    fn test_category_requires_values() {
        let mut gen = SyntheticGenerator::new(Some(2));
        let s = schema(json!({"status": {"type": "category"}}));
        assert!(gen.generate_table("t", &s, 1, &no_lookup).is_err());
    }

    #[test]
    fn test_seed_is_deterministic() {
        let s = schema(json!({
            "name": {"type": "first_name"},
            "score": {"type": "float", "min": 0.0, "max": 10.0}
        }));
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let a = SyntheticGenerator::new(Some(99))
            .with_today(today)
            .generate_table("t", &s, 5, &no_lookup)
            .unwrap();
        let b = SyntheticGenerator::new(Some(99))
            .with_today(today)
            .generate_table("t", &s, 5, &no_lookup)
            .unwrap();
        assert_eq!(a, b);
    }
}
