use std::fmt;
use std::ops::RangeInclusive;

use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub id: Option<u32>,
    pub is_current: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventsShape {
    /// One record per gameweek, one of them flagged `is_current`.
    List(Vec<EventRecord>),
    /// `{"current": 12, "next": 13, ...}`
    Mapping { current: Option<u32> },
    Unrecognized(String),
}

impl EventsShape {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Array(items) => EventsShape::List(
                items
                    .iter()
                    .map(|item| EventRecord {
                        id: item.get("id").and_then(as_positive_u32),
                        is_current: item
                            .get("is_current")
                            .and_then(Value::as_bool)
                            .unwrap_or(false),
                    })
                    .collect(),
            ),
            Value::Object(map) => EventsShape::Mapping {
                current: map.get("current").and_then(as_positive_u32),
            },
            Value::Null => EventsShape::Unrecognized("events missing".to_string()),
            other => EventsShape::Unrecognized(format!("events is {}", kind_name(other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedBy {
    ListCurrent,
    MappingCurrent,
    Fallback(String),
}

impl fmt::Display for ResolvedBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedBy::ListCurrent => f.write_str("current event in list"),
            ResolvedBy::MappingCurrent => f.write_str("events.current"),
            ResolvedBy::Fallback(reason) => write!(f, "season default ({reason})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameweekRange {
    last: u32,
    resolved_by: ResolvedBy,
}

impl GameweekRange {
    pub fn first(&self) -> u32 {
        1
    }

    pub fn last(&self) -> u32 {
        self.last
    }

    pub fn resolved_by(&self) -> &ResolvedBy {
        &self.resolved_by
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.resolved_by, ResolvedBy::Fallback(_))
    }

    pub fn iter(&self) -> RangeInclusive<u32> {
        self.first()..=self.last
    }

    pub fn contains(&self, gameweek: u32) -> bool {
        self.iter().contains(&gameweek)
    }
}

/// Never fails: anything without a usable marker gets `season_gameweeks`.
pub fn resolve_gameweeks(shape: &EventsShape, season_gameweeks: u32) -> GameweekRange {
    let fallback = |reason: &str| GameweekRange {
        last: season_gameweeks,
        resolved_by: ResolvedBy::Fallback(reason.to_string()),
    };

    match shape {
        EventsShape::List(records) => {
            match records.iter().find(|r| r.is_current).map(|r| r.id) {
                Some(Some(id)) => GameweekRange {
                    last: id,
                    resolved_by: ResolvedBy::ListCurrent,
                },
                Some(None) => fallback("current event has no usable id"),
                None => fallback("no event flagged current"),
            }
        }
        EventsShape::Mapping { current: Some(id) } => GameweekRange {
            last: *id,
            resolved_by: ResolvedBy::MappingCurrent,
        },
        EventsShape::Mapping { current: None } => {
            fallback("events.current missing or not positive")
        }
        EventsShape::Unrecognized(reason) => fallback(reason),
    }
}

fn as_positive_u32(v: &Value) -> Option<u32> {
    let n = match v {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse::<u64>().ok()?,
        _ => return None,
    };
    u32::try_from(n).ok().filter(|n| *n > 0)
}

fn kind_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a bool",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
