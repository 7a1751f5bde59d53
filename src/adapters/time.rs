//! Current time and timezone conversion.
//!
//! Tools: get_current_time, convert_time
//! Resources: time://query, time://query/<tz>, time://convert/<src>/<HH:MM>/to/<tgt>

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Offset, TimeZone, Utc};
use chrono_tz::{OffsetComponents, Tz};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::adapters::{Adapter, ResourceDef, ToolDef};
use crate::args::get_non_empty_string_arg;
use crate::error::{McpError, Result};
use crate::schema;

const LOCAL_QUERY_URI: &str = "time://query";
const TIME_FORMAT_HINT: &str = "Invalid time format. Expected HH:MM [24-hour format]";

/// Wall-clock time in one zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeResult {
    /// Zone name as requested
    pub timezone: String,
    /// ISO-8601 with seconds and numeric offset
    pub datetime: String,
    /// Whether daylight saving time is in effect
    pub is_dst: bool,
}

/// Result of `convert_time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeConversionResult {
    /// Time in the source zone
    pub source: TimeResult,
    /// Same instant in the target zone
    pub target: TimeResult,
    /// Target offset minus source offset, e.g. `+9.0h`
    pub time_difference: String,
}

/// Look up an IANA zone.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| McpError::InvalidTimezone(name.to_string()))
}

fn is_dst(dt: &DateTime<Tz>) -> bool {
    dt.offset().dst_offset().num_seconds() != 0
}

fn offset_seconds(dt: &DateTime<Tz>) -> i32 {
    dt.offset().fix().local_minus_utc()
}

fn time_result(name: &str, dt: &DateTime<Tz>) -> TimeResult {
    TimeResult {
        timezone: name.to_string(),
        datetime: dt.format("%Y-%m-%dT%H:%M:%S%:z").to_string(),
        is_dst: is_dst(dt),
    }
}

/// Format an offset difference in hours: `+9.0h`, `-5.0h`, `+5.75h`, `+5.5h`.
pub fn format_hours_difference(seconds: i32) -> String {
    let hours = f64::from(seconds) / 3600.0;
    if hours.fract() == 0.0 {
        format!("{:+.1}h", hours)
    } else {
        let text = format!("{:+.2}", hours);
        format!("{}h", text.trim_end_matches('0').trim_end_matches('.'))
    }
}

/// Current time in `timezone` at the instant `now`.
pub fn current_time(timezone: &str, now: DateTime<Utc>) -> Result<TimeResult> {
    let tz = parse_timezone(timezone)?;
    Ok(time_result(timezone, &now.with_timezone(&tz)))
}

/// Convert `HH:MM` today in `source` to `target`.
///
/// "Today" is the date in the source zone at `now`. A wall time that occurs twice
/// resolves to the standard-time instant; one skipped by a DST jump is rejected.
pub fn convert_time(
    source: &str,
    time: &str,
    target: &str,
    now: DateTime<Utc>,
) -> Result<TimeConversionResult> {
    let source_tz = parse_timezone(source)?;
    let target_tz = parse_timezone(target)?;

    let parsed = NaiveTime::parse_from_str(time, "%H:%M").map_err(|_| McpError::InvalidArg {
        name: "time".to_string(),
        reason: TIME_FORMAT_HINT.to_string(),
    })?;

    let local = now.with_timezone(&source_tz).date_naive().and_time(parsed);
    let source_time = match source_tz.from_local_datetime(&local) {
        chrono::LocalResult::Single(dt) => dt,
        chrono::LocalResult::Ambiguous(earliest, latest) => {
            if is_dst(&earliest) {
                latest
            } else {
                earliest
            }
        }
        chrono::LocalResult::None => {
            return Err(McpError::InvalidArg {
                name: "time".to_string(),
                reason: format!("{} does not exist in {} on {}", time, source, local.date()),
            })
        }
    };
    let target_time = source_time.with_timezone(&target_tz);

    Ok(TimeConversionResult {
        source: time_result(source, &source_time),
        target: time_result(target, &target_time),
        time_difference: format_hours_difference(
            offset_seconds(&target_time) - offset_seconds(&source_time),
        ),
    })
}

/// Local zone: the override if given, else the system zone, else UTC.
pub fn resolve_local_timezone(override_name: Option<&str>) -> Result<Tz> {
    if let Some(name) = override_name {
        return parse_timezone(name);
    }
    let detected = iana_time_zone::get_timezone()
        .ok()
        .and_then(|name| name.parse::<Tz>().ok());
    if detected.is_none() {
        tracing::warn!("Could not detect the system timezone, falling back to UTC");
    }
    Ok(detected.unwrap_or(Tz::UTC))
}

/// Time server state.
pub struct TimeAdapter {
    local_tz: Tz,
}

impl TimeAdapter {
    /// Create the adapter with an optional local zone override.
    pub fn new(local_timezone: Option<&str>) -> Result<Self> {
        let local_tz = resolve_local_timezone(local_timezone)?;
        tracing::info!("Local timezone: {}", local_tz.name());
        Ok(Self { local_tz })
    }

    /// Name of the local zone.
    pub fn local_timezone(&self) -> &str {
        self.local_tz.name()
    }

    /// Resource URIs may say `local` instead of a zone name.
    fn zone_name<'a>(&'a self, name: &'a str) -> &'a str {
        if name == "local" {
            self.local_timezone()
        } else {
            name
        }
    }

    /// Tool definitions, with the local zone named in the argument help.
    pub fn tool_defs(&self) -> Vec<ToolDef> {
        let local = self.local_timezone();
        vec![
            ToolDef::new(
                "get_current_time",
                "Get current time in a specific timezone",
                schema!(object {
                    required: {
                        "timezone": string => format!(
                            "IANA timezone name (e.g., 'America/New_York', 'Europe/London'). Use '{}' as local timezone if no timezone provided by the user.",
                            local
                        )
                    }
                }),
            ),
            ToolDef::new(
                "convert_time",
                "Convert time between timezones",
                schema!(object {
                    required: {
                        "source_timezone": string => format!(
                            "Source IANA timezone name (e.g., 'America/New_York', 'Europe/London'). Use '{}' as local timezone if no source timezone provided by the user.",
                            local
                        ),
                        "time": string => "Time to convert in 24-hour format (HH:MM)",
                        "target_timezone": string => format!(
                            "Target IANA timezone name (e.g., 'Asia/Tokyo', 'America/San_Francisco'). Use '{}' as local timezone if no target timezone provided by the user.",
                            local
                        )
                    }
                }),
            ),
        ]
    }
}

#[async_trait]
impl Adapter for TimeAdapter {
    fn server_name(&self) -> &str {
        "mcp-time"
    }

    fn tools(&self) -> Vec<ToolDef> {
        self.tool_defs()
    }

    async fn call_tool(&mut self, name: &str, args: Map<String, JsonValue>) -> Result<String> {
        let now = Utc::now();
        match name {
            "get_current_time" => {
                let timezone = get_non_empty_string_arg(&args, "timezone")?;
                let result = current_time(&timezone, now)?;
                Ok(serde_json::to_string_pretty(&result)?)
            }
            "convert_time" => {
                let source = get_non_empty_string_arg(&args, "source_timezone")?;
                let time = get_non_empty_string_arg(&args, "time")?;
                let target = get_non_empty_string_arg(&args, "target_timezone")?;
                let result = convert_time(&source, &time, &target, now)?;
                Ok(serde_json::to_string_pretty(&result)?)
            }
            _ => Err(McpError::UnknownTool(name.to_string())),
        }
    }

    fn resources(&self) -> Vec<ResourceDef> {
        vec![ResourceDef::new(
            LOCAL_QUERY_URI,
            "Local Time Query",
            &format!(
                "Get current time in your local timezone ({})",
                self.local_timezone()
            ),
            "application/json",
        )]
    }

    async fn read_resource(&mut self, uri: &str) -> Result<String> {
        let now = Utc::now();
        if uri == LOCAL_QUERY_URI {
            let result = current_time(self.local_timezone(), now)?;
            return Ok(serde_json::to_string_pretty(&result)?);
        }
        if let Some(zone) = uri.strip_prefix("time://query/") {
            let result = current_time(self.zone_name(zone), now)?;
            return Ok(serde_json::to_string_pretty(&result)?);
        }
        if let Some(path) = uri.strip_prefix("time://convert/") {
            let (source_info, target) = path
                .split_once("/to/")
                .ok_or_else(|| McpError::UnknownResource(uri.to_string()))?;
            let (source, time) = source_info
                .rsplit_once('/')
                .ok_or_else(|| McpError::UnknownResource(uri.to_string()))?;
            let result = convert_time(
                self.zone_name(source),
                time,
                self.zone_name(target),
                now,
            )?;
            return Ok(serde_json::to_string_pretty(&result)?);
        }
        Err(McpError::UnknownResource(uri.to_string()))
    }
}
