//! Mapping between clap arguments, JSON schema properties and argv.

use clap::builder::ValueParser;
use clap::{value_parser, Arg, ArgAction};
use serde_json::{json, Map, Value as JsonValue};

use crate::error::{McpError, Result};

/// JSON shape of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Free text
    Text,
    /// Whole number
    Integer,
    /// Floating point number
    Number,
    /// `--flag` that sets true
    Flag,
    /// `--flag` that sets false
    NegatedFlag,
    /// `-v -v -v` style counter
    Count,
    /// Several values, text items
    TextList,
    /// Several values, integer items
    IntegerList,
}

/// One clap argument, as exposed to tool callers.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    /// Argument id; also the JSON property name
    pub id: String,
    /// `--long` name
    pub long: Option<String>,
    /// `-s` name
    pub short: Option<char>,
    /// Positional rather than an option
    pub positional: bool,
    /// JSON shape
    pub kind: ParamKind,
    /// Must be supplied
    pub required: bool,
    /// Allowed values
    pub choices: Vec<String>,
    /// Help text
    pub help: Option<String>,
    /// Default value as clap renders it
    pub default: Option<String>,
}

fn integer_parsers() -> Vec<ValueParser> {
    vec![
        value_parser!(i64).into(),
        value_parser!(i32).into(),
        value_parser!(i16).into(),
        value_parser!(i8).into(),
        value_parser!(u64).into(),
        value_parser!(u32).into(),
        value_parser!(u16).into(),
        value_parser!(u8).into(),
        value_parser!(usize).into(),
    ]
}

fn value_kind(arg: &Arg) -> ParamKind {
    let parser_id = arg.get_value_parser().type_id();
    if integer_parsers().iter().any(|p| p.type_id() == parser_id) {
        return ParamKind::Integer;
    }
    let float_parsers: [ValueParser; 2] = [value_parser!(f64).into(), value_parser!(f32).into()];
    if float_parsers.iter().any(|p| p.type_id() == parser_id) {
        return ParamKind::Number;
    }
    ParamKind::Text
}

impl ParamSpec {
    /// Describe `arg`, or `None` for help/version switches.
    pub fn from_arg(arg: &Arg) -> Option<Self> {
        let multiple = arg
            .get_num_args()
            .map_or(false, |range| range.max_values() > 1);

        let kind = match arg.get_action() {
            ArgAction::Help | ArgAction::HelpShort | ArgAction::HelpLong | ArgAction::Version => {
                return None
            }
            ArgAction::SetTrue => ParamKind::Flag,
            ArgAction::SetFalse => ParamKind::NegatedFlag,
            ArgAction::Count => ParamKind::Count,
            ArgAction::Append => list_of(value_kind(arg)),
            _ if multiple => list_of(value_kind(arg)),
            _ => value_kind(arg),
        };

        let is_flag = matches!(
            kind,
            ParamKind::Flag | ParamKind::NegatedFlag | ParamKind::Count
        );
        let default = if is_flag {
            None
        } else {
            arg.get_default_values()
                .first()
                .map(|v| v.to_string_lossy().into_owned())
        };

        Some(Self {
            id: arg.get_id().as_str().to_string(),
            long: arg.get_long().map(str::to_string),
            short: arg.get_short(),
            positional: arg.is_positional(),
            kind,
            required: arg.is_required_set(),
            choices: arg
                .get_possible_values()
                .iter()
                .map(|pv| pv.get_name().to_string())
                .collect(),
            help: arg.get_help().map(|h| h.to_string()),
            default,
        })
    }

    /// JSON schema property for this parameter.
    pub fn schema(&self) -> JsonValue {
        let mut prop = match self.kind {
            ParamKind::Text => json!({"type": "string"}),
            ParamKind::Integer | ParamKind::Count => json!({"type": "integer"}),
            ParamKind::Number => json!({"type": "number"}),
            ParamKind::Flag | ParamKind::NegatedFlag => json!({"type": "boolean"}),
            ParamKind::TextList => json!({"type": "array", "items": {"type": "string"}}),
            ParamKind::IntegerList => json!({"type": "array", "items": {"type": "integer"}}),
        };

        if !self.choices.is_empty() {
            let choices = JsonValue::from(self.choices.clone());
            match self.kind {
                ParamKind::TextList => prop["items"]["enum"] = choices,
                _ => prop["enum"] = choices,
            }
        }
        if let Some(help) = &self.help {
            prop["description"] = JsonValue::from(help.as_str());
        }
        if let Some(default) = &self.default {
            prop["default"] = match self.kind {
                ParamKind::Integer => default
                    .parse::<i64>()
                    .map(JsonValue::from)
                    .unwrap_or_else(|_| JsonValue::from(default.as_str())),
                ParamKind::Number => default
                    .parse::<f64>()
                    .map(JsonValue::from)
                    .unwrap_or_else(|_| JsonValue::from(default.as_str())),
                _ => JsonValue::from(default.as_str()),
            };
        }
        prop
    }

    fn invalid(&self, reason: &str) -> McpError {
        McpError::Command(format!("Invalid arguments: parameter '{}' {}", self.id, reason))
    }

    fn check_choice(&self, value: &str) -> Result<()> {
        if self.choices.is_empty() || self.choices.iter().any(|c| c == value) {
            Ok(())
        } else {
            Err(self.invalid(&format!(
                "must be one of {}, got '{}'",
                self.choices.join(", "),
                value
            )))
        }
    }

    fn scalar(&self, value: &JsonValue, integer: bool) -> Result<String> {
        let text = match value {
            JsonValue::String(s) if !integer => s.clone(),
            JsonValue::Number(n) if integer => n
                .as_i64()
                .map(|i| i.to_string())
                .ok_or_else(|| self.invalid("must be an integer"))?,
            JsonValue::Number(n) if !integer => n.to_string(),
            _ if integer => return Err(self.invalid("must be an integer")),
            _ => return Err(self.invalid("must be a string")),
        };
        self.check_choice(&text)?;
        Ok(text)
    }

    /// Validate `value` and render it as command-line values.
    ///
    /// Flags render as how many times the switch should be repeated.
    pub fn render(&self, value: &JsonValue) -> Result<Rendered> {
        match self.kind {
            ParamKind::Text => Ok(Rendered::Values(vec![self.scalar(value, false)?])),
            ParamKind::Integer => Ok(Rendered::Values(vec![self.scalar(value, true)?])),
            ParamKind::Number => match value {
                JsonValue::Number(n) => Ok(Rendered::Values(vec![n.to_string()])),
                _ => Err(self.invalid("must be a number")),
            },
            ParamKind::Flag => match value {
                JsonValue::Bool(b) => Ok(Rendered::Switch(usize::from(*b))),
                _ => Err(self.invalid("must be a boolean")),
            },
            ParamKind::NegatedFlag => match value {
                JsonValue::Bool(b) => Ok(Rendered::Switch(usize::from(!*b))),
                _ => Err(self.invalid("must be a boolean")),
            },
            ParamKind::Count => match value.as_u64() {
                Some(n) => Ok(Rendered::Switch(n as usize)),
                None => Err(self.invalid("must be a non-negative integer")),
            },
            ParamKind::TextList | ParamKind::IntegerList => {
                let items = value.as_array().ok_or_else(|| self.invalid("must be an array"))?;
                let integer = self.kind == ParamKind::IntegerList;
                items
                    .iter()
                    .map(|item| self.scalar(item, integer))
                    .collect::<Result<Vec<_>>>()
                    .map(Rendered::Values)
            }
        }
    }

    /// How the option is spelled on the command line.
    pub fn switch(&self) -> String {
        match (&self.long, self.short) {
            (Some(long), _) => format!("--{}", long),
            (None, Some(short)) => format!("-{}", short),
            (None, None) => format!("--{}", self.id),
        }
    }
}

fn list_of(kind: ParamKind) -> ParamKind {
    match kind {
        ParamKind::Integer => ParamKind::IntegerList,
        _ => ParamKind::TextList,
    }
}

/// A parameter value ready for argv.
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    /// Repeat the switch this many times
    Switch(usize),
    /// Values to pass
    Values(Vec<String>),
}

/// Build the argument vector for one call.
///
/// Options come first as `--long value`, then positionals, separated by `--`
/// when a positional value would otherwise look like an option.
pub fn build_argv(
    command_path: &[String],
    params: &[ParamSpec],
    args: &Map<String, JsonValue>,
) -> Result<Vec<String>> {
    for key in args.keys() {
        if !params.iter().any(|p| &p.id == key) {
            return Err(McpError::Command(format!(
                "Invalid arguments: unknown parameter '{}'",
                key
            )));
        }
    }

    let mut argv: Vec<String> = command_path.to_vec();
    let mut positionals: Vec<String> = Vec::new();

    for param in params {
        let value = match args.get(&param.id) {
            Some(JsonValue::Null) | None => {
                if param.required {
                    return Err(McpError::Command(format!(
                        "Invalid arguments: missing required parameter '{}'",
                        param.id
                    )));
                }
                continue;
            }
            Some(v) => v,
        };

        match param.render(value)? {
            Rendered::Switch(times) => {
                for _ in 0..times {
                    argv.push(param.switch());
                }
            }
            Rendered::Values(values) if param.positional => positionals.extend(values),
            Rendered::Values(values) => {
                for v in values {
                    argv.push(param.switch());
                    argv.push(v);
                }
            }
        }
    }

    if positionals.iter().any(|p| p.starts_with('-')) {
        argv.push("--".to_string());
    }
    argv.extend(positionals);
    Ok(argv)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(arg: Arg) -> ParamSpec {
        ParamSpec::from_arg(&arg).unwrap()
    }

    fn obj(value: JsonValue) -> Map<String, JsonValue> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_kinds_from_clap() {
        let port = spec(Arg::new("port").long("port").value_parser(value_parser!(u16)));
        assert_eq!(port.kind, ParamKind::Integer);

        let force = spec(Arg::new("force").long("force").action(ArgAction::SetTrue));
        assert_eq!(force.kind, ParamKind::Flag);

        let names = spec(Arg::new("names").num_args(1..).required(true));
        assert_eq!(names.kind, ParamKind::TextList);
        assert!(names.positional);
        assert!(names.required);

        let greeting = spec(Arg::new("greeting").long("greeting").value_parser(["Hello", "Hi"]));
        assert_eq!(greeting.choices, vec!["Hello", "Hi"]);
        assert_eq!(greeting.schema()["enum"], json!(["Hello", "Hi"]));

        let help = Arg::new("help").long("help").action(ArgAction::Help);
        assert!(ParamSpec::from_arg(&help).is_none());
    }

    #[test]
    fn test_integer_default_in_schema() {
        let port = spec(
            Arg::new("port")
                .long("port")
                .value_parser(value_parser!(u16))
                .default_value("5432")
                .help("Port number"),
        );
        let schema = port.schema();
        assert_eq!(schema["type"], "integer");
        assert_eq!(schema["default"], 5432);
        assert_eq!(schema["description"], "Port number");
    }

    #[test]
    fn test_argv_orders_options_before_positionals() {
        let params = vec![
            spec(Arg::new("names").num_args(1..).required(true)),
            spec(Arg::new("force").long("force").action(ArgAction::SetTrue)),
        ];
        let path = vec!["cli".to_string(), "db".to_string(), "drop".to_string()];

        let args = obj(json!({"names": ["a", "b"], "force": true}));
        let argv = build_argv(&path, &params, &args).unwrap();
        assert_eq!(argv, vec!["cli", "db", "drop", "--force", "a", "b"]);

        let argv = build_argv(&path, &params, &obj(json!({"names": ["-x"]}))).unwrap();
        assert_eq!(argv, vec!["cli", "db", "drop", "--", "-x"]);
    }

    #[test]
    fn test_argv_validation_errors() {
        let params = vec![
            spec(Arg::new("name").long("name").required(true)),
            spec(Arg::new("port").long("port").value_parser(value_parser!(u16))),
        ];
        let path = vec!["cli".to_string()];

        let err = build_argv(&path, &params, &obj(json!({}))).unwrap_err();
        assert!(err.to_string().contains("missing required parameter 'name'"));

        let err = build_argv(&path, &params, &obj(json!({"name": "x", "bogus": 1}))).unwrap_err();
        assert!(err.to_string().contains("unknown parameter 'bogus'"));

        let args = obj(json!({"name": "x", "port": "high"}));
        let err = build_argv(&path, &params, &args).unwrap_err();
        assert!(err.to_string().contains("must be an integer"));
    }
}
