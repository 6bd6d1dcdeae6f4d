// Date and time node kinds
//
// Storage only knows date-times, so a Date is stored as midnight of its day
// and truncated back to a date when it is read.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::trace;

use crate::schema::node::{Context, ConvertResult, NodeConfig, NodeKind};
use crate::value::{Slot, Value};

/// Offset-aware text layouts, tried after RFC 3339.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
];

/// Wall-clock text layouts.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses timestamp text.
///
/// Text carrying an offset is moved to UTC, or keeps its wall-clock time
/// when `ignore_tz` is set. A bare date is read as midnight.
pub(crate) fn parse_timestamp(text: &str, ignore_tz: bool) -> Option<NaiveDateTime> {
    let text = text.trim();

    let aware = DateTime::parse_from_rfc3339(text).ok().or_else(|| {
        OFFSET_FORMATS
            .iter()
            .find_map(|format| DateTime::parse_from_str(text, format).ok())
    });
    if let Some(aware) = aware {
        return Some(if ignore_tz {
            aware.naive_local()
        } else {
            aware.naive_utc()
        });
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, DATE_FORMAT)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

fn midnight(node: &NodeConfig, kind: &str, date: NaiveDate) -> ConvertResult<NaiveDateTime> {
    date.and_hms_opt(0, 0, 0)
        .ok_or_else(|| node.invalid(kind, format!("{} has no midnight", date)))
}

/// Date node: a calendar day stored as midnight.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateNode;

impl DateNode {
    pub fn new() -> Self {
        DateNode
    }
}

impl NodeKind for DateNode {
    fn type_name(&self) -> &'static str {
        "Date"
    }

    fn do_serialize(&self, node: &NodeConfig, value: Slot, _: &Slot, _: &Context) -> ConvertResult<Slot> {
        let date = match value {
            Slot::Absent => return Ok(Slot::Absent),
            Slot::Present(Value::Null) => return Ok(Slot::Present(Value::Null)),
            Slot::Present(Value::Date(date)) => date,
            Slot::Present(Value::DateTime(dt)) => dt.date(),
            Slot::Present(Value::String(text)) => match parse_timestamp(&text, true) {
                Some(dt) => dt.date(),
                None => {
                    return Err(node.invalid(
                        self.type_name(),
                        format!("'{}' is not a valid date", text),
                    ))
                }
            },
            Slot::Present(other) => {
                return Err(node.invalid(
                    self.type_name(),
                    format!("cannot convert {} to date", other.type_name()),
                ))
            }
        };
        midnight(node, self.type_name(), date).map(|dt| Slot::Present(Value::DateTime(dt)))
    }

    fn do_deserialize(&self, _: &NodeConfig, value: Slot, _: &Slot, _: &Context) -> ConvertResult<Slot> {
        match value {
            Slot::Present(Value::DateTime(dt)) => Ok(Slot::Present(Value::Date(dt.date()))),
            other => Ok(other),
        }
    }
}

/// DateTime node: a timestamp without offset.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateTimeNode {
    ignore_tz: bool,
}

impl DateTimeNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps the wall-clock time of offset-aware text instead of moving it
    /// to UTC.
    pub fn ignore_tz(mut self, ignore_tz: bool) -> Self {
        self.ignore_tz = ignore_tz;
        self
    }
}

impl NodeKind for DateTimeNode {
    fn type_name(&self) -> &'static str {
        "DateTime"
    }

    fn do_serialize(&self, node: &NodeConfig, value: Slot, _: &Slot, _: &Context) -> ConvertResult<Slot> {
        let dt = match value {
            Slot::Absent => return Ok(Slot::Absent),
            Slot::Present(Value::Null) => return Ok(Slot::Present(Value::Null)),
            Slot::Present(Value::DateTime(dt)) => dt,
            Slot::Present(Value::Date(date)) => midnight(node, self.type_name(), date)?,
            Slot::Present(Value::String(text)) => match parse_timestamp(&text, self.ignore_tz) {
                Some(dt) => {
                    trace!(input = %text, parsed = %dt, "parsed timestamp text");
                    dt
                }
                None => {
                    return Err(node.invalid(
                        self.type_name(),
                        format!("'{}' is not a valid timestamp", text),
                    ))
                }
            },
            Slot::Present(other) => {
                return Err(node.invalid(
                    self.type_name(),
                    format!("cannot convert {} to datetime", other.type_name()),
                ))
            }
        };
        Ok(Slot::Present(Value::DateTime(dt)))
    }
}

impl_into_node!(DateNode, DateTimeNode);
