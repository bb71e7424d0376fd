#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::rc::Rc;

use serde_json::{Value, json};

use fpl_draft_warehouse::api::{EmptyReason, Endpoint, FetchOutcome, UpstreamApi};
use fpl_draft_warehouse::error::WarehouseError;
use fpl_draft_warehouse::normalize::Row;
use fpl_draft_warehouse::warehouse::{DatasetStatus, Warehouse};

pub const LEAGUE_ID: u32 = 4193;
pub const ENTRY_IDS: [i64; 2] = [101, 102];

pub fn read_fixture(name: &str) -> Value {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    let raw = fs::read_to_string(path).expect("fixture file should be readable");
    serde_json::from_str(&raw).expect("fixture should be valid json")
}

/// Shared, ordered record of every fetch and warehouse call.
pub type Journal = Rc<RefCell<Vec<String>>>;

pub fn journal() -> Journal {
    Rc::new(RefCell::new(Vec::new()))
}

/// Serves canned payloads by endpoint path. Unknown paths answer 404.
pub struct FakeApi {
    payloads: HashMap<String, Value>,
    failing: HashSet<String>,
    journal: Journal,
}

impl FakeApi {
    pub fn new(journal: Journal) -> Self {
        Self {
            payloads: HashMap::new(),
            failing: HashSet::new(),
            journal,
        }
    }

    /// Two managers over gameweeks 1 and 2, see `tests/fixtures`.
    pub fn league(journal: Journal) -> Self {
        let mut api = Self::new(journal);
        api.insert(Endpoint::BootstrapStatic, read_fixture("bootstrap_static.json"));
        api.insert(
            Endpoint::LeagueDetails {
                league_id: LEAGUE_ID,
            },
            read_fixture("league_details.json"),
        );
        api.insert(
            Endpoint::DraftChoices {
                league_id: LEAGUE_ID,
            },
            read_fixture("draft_choices.json"),
        );

        api.insert(
            Endpoint::EventLive { gameweek: 1 },
            live_payload(&[(1, 6), (2, 2), (3, 5), (4, 3), (5, 1), (6, 0)]),
        );
        api.insert(
            Endpoint::EventLive { gameweek: 2 },
            live_payload(&[(1, 2), (2, 8), (3, 4), (4, 7), (5, 9), (6, 1)]),
        );

        api.insert(
            Endpoint::EntryEvent {
                entry_id: 101,
                gameweek: 1,
            },
            picks_payload(&[(1, 1), (4, 12)]),
        );
        api.insert(
            Endpoint::EntryEvent {
                entry_id: 101,
                gameweek: 2,
            },
            picks_payload(&[(1, 1), (5, 2), (4, 12)]),
        );
        api.insert(
            Endpoint::EntryEvent {
                entry_id: 102,
                gameweek: 1,
            },
            picks_payload(&[(2, 1), (3, 2)]),
        );
        api.insert(
            Endpoint::EntryEvent {
                entry_id: 102,
                gameweek: 2,
            },
            picks_payload(&[(2, 1), (3, 12)]),
        );
        api
    }

    pub fn insert(&mut self, endpoint: Endpoint, payload: Value) {
        self.payloads.insert(endpoint.path(), payload);
    }

    pub fn fail(&mut self, endpoint: Endpoint) {
        self.failing.insert(endpoint.path());
    }

    pub fn fetched(&self) -> Vec<String> {
        self.journal
            .borrow()
            .iter()
            .filter_map(|line| line.strip_prefix("fetch ").map(str::to_string))
            .collect()
    }
}

impl UpstreamApi for FakeApi {
    fn fetch(&self, endpoint: &Endpoint) -> FetchOutcome {
        let path = endpoint.path();
        self.journal.borrow_mut().push(format!("fetch {path}"));
        if self.failing.contains(&path) {
            return FetchOutcome::Empty(EmptyReason::Status(500));
        }
        match self.payloads.get(&path) {
            Some(payload) => FetchOutcome::Data(payload.clone()),
            None => FetchOutcome::Empty(EmptyReason::Status(404)),
        }
    }
}

/// In-memory warehouse that keeps the last rows written per table.
pub struct RecordingWarehouse {
    pub tables: HashMap<String, Vec<Row>>,
    pub statements: Vec<String>,
    pub fail_table: Option<String>,
    pub fail_dataset: bool,
    journal: Journal,
}

impl RecordingWarehouse {
    pub fn new(journal: Journal) -> Self {
        Self {
            tables: HashMap::new(),
            statements: Vec::new(),
            fail_table: None,
            fail_dataset: false,
            journal,
        }
    }

    pub fn rows(&self, table: &str) -> &[Row] {
        self.tables.get(table).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn writes(&self) -> Vec<String> {
        self.journal
            .borrow()
            .iter()
            .filter_map(|line| line.strip_prefix("write ").map(str::to_string))
            .collect()
    }
}

impl Warehouse for RecordingWarehouse {
    fn dataset_id(&self) -> &str {
        "test_ds"
    }

    fn ensure_dataset(&mut self) -> Result<DatasetStatus, WarehouseError> {
        self.journal.borrow_mut().push("ensure_dataset".to_string());
        if self.fail_dataset {
            return Err(WarehouseError::Io {
                path: PathBuf::from("/nowhere"),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "read-only"),
            });
        }
        Ok(DatasetStatus::Created)
    }

    fn write_truncate(&mut self, table: &str, rows: &[Row]) -> Result<usize, WarehouseError> {
        self.journal.borrow_mut().push(format!("write {table}"));
        if self.fail_table.as_deref() == Some(table) {
            return Err(WarehouseError::Io {
                path: PathBuf::from(table),
                source: io::Error::other("disk full"),
            });
        }
        self.tables.insert(table.to_string(), rows.to_vec());
        Ok(rows.len())
    }

    fn execute(&mut self, sql: &str) -> Result<(), WarehouseError> {
        self.journal.borrow_mut().push("execute".to_string());
        self.statements.push(sql.to_string());
        if sql.contains("FAIL_ME") {
            return Err(WarehouseError::InvalidIdentifier("FAIL_ME".to_string()));
        }
        Ok(())
    }
}

pub fn live_payload(points: &[(i64, i64)]) -> Value {
    let mut elements = serde_json::Map::new();
    for (element, total) in points {
        elements.insert(
            element.to_string(),
            json!({
                "stats": {"minutes": 90, "goals_scored": 0, "total_points": total},
                "explain": []
            }),
        );
    }
    json!({"elements": elements, "fixtures": []})
}

pub fn picks_payload(picks: &[(i64, i64)]) -> Value {
    let picks = picks
        .iter()
        .map(|(element, position)| {
            json!({
                "element": element,
                "position": position,
                "is_captain": false,
                "is_vice_captain": false,
                "multiplier": 1
            })
        })
        .collect::<Vec<_>>();
    json!({"picks": picks, "entry_history": {}, "subs": []})
}
