use std::collections::HashSet;

use serde_json::{Map, Value};
use tracing::debug;

use crate::gameweek::EventsShape;

pub type Row = Map<String, Value>;
pub type RowSet = Vec<Row>;

pub const ELEMENT_ID: &str = "element_id";
pub const ENTRY_ID: &str = "entry_id";
pub const GAMEWEEK: &str = "gameweek";

#[derive(Debug, Clone, PartialEq)]
pub struct StaticMetadata {
    pub elements: RowSet,
    pub teams: RowSet,
    pub element_types: RowSet,
    pub events: EventsShape,
}

pub fn normalize_bootstrap(payload: &Value) -> StaticMetadata {
    StaticMetadata {
        elements: object_rows(payload.get("elements")),
        teams: object_rows(payload.get("teams")),
        element_types: object_rows(payload.get("element_types")),
        events: EventsShape::from_value(payload.get("events").unwrap_or(&Value::Null)),
    }
}

/// Flattens `{"elements": {"<id>": {"stats": {...}}}}` into one row per element.
pub fn normalize_live_stats(payload: &Value, gameweek: u32) -> RowSet {
    let Some(elements) = payload.get("elements").and_then(Value::as_object) else {
        return Vec::new();
    };

    let mut rows = Vec::with_capacity(elements.len());
    let mut skipped = 0usize;
    for (key, info) in elements {
        let Ok(element_id) = key.trim().parse::<i64>() else {
            skipped += 1;
            continue;
        };
        let Some(stats) = info.get("stats").and_then(Value::as_object) else {
            skipped += 1;
            continue;
        };
        let mut row = stats.clone();
        row.insert(ELEMENT_ID.to_string(), Value::from(element_id));
        row.insert(GAMEWEEK.to_string(), Value::from(gameweek));
        rows.push(row);
    }
    if skipped > 0 {
        debug!(gameweek, skipped, "skipped live entries without stats");
    }
    rows
}

pub fn normalize_entry_picks(payload: &Value, entry_id: i64, gameweek: u32) -> RowSet {
    let mut rows = object_rows(payload.get("picks"));
    for row in &mut rows {
        row.insert(ENTRY_ID.to_string(), Value::from(entry_id));
        row.insert(GAMEWEEK.to_string(), Value::from(gameweek));
    }
    rows
}

pub fn normalize_draft_choices(payload: &Value) -> RowSet {
    object_rows(payload.get("choices"))
}

pub fn normalize_league_entries(payload: &Value) -> RowSet {
    object_rows(payload.get("league_entries"))
}

/// Distinct `entry_id` values in first-seen order.
pub fn entry_ids(entries: &[Row]) -> Vec<i64> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for row in entries {
        let Some(id) = row.get(ENTRY_ID).and_then(as_i64_any) else {
            continue;
        };
        if seen.insert(id) {
            out.push(id);
        }
    }
    out
}

fn object_rows(value: Option<&Value>) -> RowSet {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_object().cloned())
                .collect()
        })
        .unwrap_or_default()
}

fn as_i64_any(v: &Value) -> Option<i64> {
    if let Some(n) = v.as_i64() {
        return Some(n);
    }
    v.as_str()?.trim().parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn live_stats_inject_element_and_gameweek() {
        let payload = json!({
            "elements": {
                "12": {"stats": {"total_points": 6, "minutes": 90}, "explain": []},
                "7": {"stats": {"total_points": 2, "minutes": 45}},
                "oops": {"stats": {"total_points": 1}},
                "9": {"explain": []}
            },
            "fixtures": []
        });
        let rows = normalize_live_stats(&payload, 4);
        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert_eq!(row[GAMEWEEK], json!(4));
            assert!(row[ELEMENT_ID].is_i64());
        }
        let ids: Vec<i64> = rows.iter().filter_map(|r| r[ELEMENT_ID].as_i64()).collect();
        assert!(ids.contains(&12));
        assert!(ids.contains(&7));
        let twelve = rows.iter().find(|r| r[ELEMENT_ID] == json!(12)).unwrap();
        assert_eq!(twelve["total_points"], json!(6));
        assert!(!twelve.contains_key("explain"));
    }

    #[test]
    fn malformed_payloads_are_empty() {
        assert!(normalize_live_stats(&json!(null), 1).is_empty());
        assert!(normalize_live_stats(&json!({"elements": []}), 1).is_empty());
        assert!(normalize_entry_picks(&json!({"picks": "none"}), 1, 1).is_empty());
        assert!(normalize_draft_choices(&json!([])).is_empty());
        assert!(normalize_league_entries(&json!({})).is_empty());

        let meta = normalize_bootstrap(&json!({"elements": {"1": {}}}));
        assert!(meta.elements.is_empty());
        assert!(meta.teams.is_empty());
        assert!(matches!(meta.events, EventsShape::Unrecognized(_)));
    }

    #[test]
    fn picks_carry_entry_and_gameweek() {
        let payload = json!({
            "picks": [
                {"element": 3, "position": 1, "is_captain": false},
                {"element": 8, "position": 12, "is_captain": false},
                "not a pick"
            ],
            "subs": []
        });
        let rows = normalize_entry_picks(&payload, 501, 9);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r[ENTRY_ID] == json!(501) && r[GAMEWEEK] == json!(9)));
        assert_eq!(rows[1]["position"], json!(12));
    }

    #[test]
    fn bootstrap_passes_arrays_through() {
        let payload = json!({
            "elements": [{"id": 1, "web_name": "Raya"}, {"id": 2, "web_name": "Saka"}],
            "teams": [{"id": 1, "short_name": "ARS"}],
            "element_types": [{"id": 1, "singular_name_short": "GKP"}],
            "events": {"current": 3}
        });
        let meta = normalize_bootstrap(&payload);
        assert_eq!(meta.elements.len(), 2);
        assert_eq!(meta.teams.len(), 1);
        assert_eq!(meta.element_types.len(), 1);
        assert_eq!(meta.events, EventsShape::Mapping { current: Some(3) });
    }

    #[test]
    fn entry_ids_dedup_in_order() {
        let entries = normalize_league_entries(&json!({
            "league_entries": [
                {"entry_id": 30, "entry_name": "C"},
                {"entry_id": 10, "entry_name": "A"},
                {"entry_id": "30", "entry_name": "C again"},
                {"entry_name": "no id"}
            ]
        }));
        assert_eq!(entry_ids(&entries), vec![30, 10]);
    }
}
