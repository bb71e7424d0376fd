use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_API_BASE_URL: &str = "https://draft.premierleague.com/api";
/// Upper bound used when the season metadata carries no usable current-week marker.
pub const DEFAULT_SEASON_GAMEWEEKS: u32 = 38;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_DATASET_ID: &str = "fpl_draft_data";
pub const DEFAULT_LOCATION: &str = "EU";

const APP_DIR: &str = "fpl_draft_warehouse";
const PROJECT_FILE: &str = "warehouse.sqlite";
const USER_AGENT: &str = concat!("fpl_draft_warehouse/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub league_id: u32,
    /// Fallback upper bound for the gameweek loop.
    pub season_gameweeks: u32,
    pub api: ApiConfig,
    pub warehouse: WarehouseConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WarehouseConfig {
    pub dir: PathBuf,
    pub dataset_id: String,
    /// Recorded on the dataset when it is first created.
    pub location: String,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            user_agent: USER_AGENT.to_string(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE_URL)
    }
}

impl WarehouseConfig {
    pub fn new(dir: impl Into<PathBuf>, dataset_id: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            dataset_id: dataset_id.into(),
            location: DEFAULT_LOCATION.to_string(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self::from_lookup(&|key: &str| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_identifier(&self.dataset_id) {
            return Err(ConfigError::Invalid {
                key: "WAREHOUSE_DATASET_ID",
                value: self.dataset_id.clone(),
                reason: "expected letters, digits and underscores, not starting with a digit",
            });
        }
        if is_reserved_schema(&self.dataset_id) {
            return Err(ConfigError::Invalid {
                key: "WAREHOUSE_DATASET_ID",
                value: self.dataset_id.clone(),
                reason: "main and temp are reserved sqlite schema names",
            });
        }
        Ok(())
    }

    fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let dir = match get("WAREHOUSE_DIR") {
            Some(dir) => PathBuf::from(dir.trim()),
            None => default_warehouse_dir(lookup).ok_or(ConfigError::NoWarehouseDir)?,
        };
        let mut config = Self::new(
            dir,
            get("WAREHOUSE_DATASET_ID")
                .map(|id| id.trim().to_string())
                .unwrap_or_else(|| DEFAULT_DATASET_ID.to_string()),
        );
        if let Some(location) = get("WAREHOUSE_LOCATION") {
            config.location = location.trim().to_string();
        }
        Ok(config)
    }

    pub fn project_path(&self) -> PathBuf {
        self.dir.join(PROJECT_FILE)
    }

    pub fn with_dir(mut self, dir: &Path) -> Self {
        self.dir = dir.to_path_buf();
        self
    }

    pub fn dataset_path(&self) -> PathBuf {
        self.dir.join(format!("{}.sqlite", self.dataset_id))
    }
}

impl PipelineConfig {
    pub fn new(league_id: u32, warehouse: WarehouseConfig) -> Self {
        Self {
            league_id,
            season_gameweeks: DEFAULT_SEASON_GAMEWEEKS,
            api: ApiConfig::default(),
            warehouse,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let league_id = match get("FPL_LEAGUE_ID") {
            Some(raw) => parse_number::<u32>("FPL_LEAGUE_ID", &raw)?,
            None => return Err(ConfigError::Missing("FPL_LEAGUE_ID")),
        };
        let season_gameweeks = match get("FPL_SEASON_GAMEWEEKS") {
            Some(raw) => parse_number::<u32>("FPL_SEASON_GAMEWEEKS", &raw)?,
            None => DEFAULT_SEASON_GAMEWEEKS,
        };

        let mut api = ApiConfig::new(
            get("FPL_API_BASE_URL").unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
        );
        if let Some(raw) = get("FPL_REQUEST_TIMEOUT_SECS") {
            let secs = parse_number::<u64>("FPL_REQUEST_TIMEOUT_SECS", &raw)?;
            api.timeout = Duration::from_secs(secs);
        }

        let warehouse = WarehouseConfig::from_lookup(&lookup)?;

        let config = Self {
            league_id,
            season_gameweeks,
            api,
            warehouse,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_warehouse_dir(mut self, dir: &Path) -> Self {
        self.warehouse = self.warehouse.with_dir(dir);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.league_id == 0 {
            return Err(ConfigError::Invalid {
                key: "FPL_LEAGUE_ID",
                value: "0".to_string(),
                reason: "league id must be positive",
            });
        }
        if self.season_gameweeks == 0 {
            return Err(ConfigError::Invalid {
                key: "FPL_SEASON_GAMEWEEKS",
                value: "0".to_string(),
                reason: "a season has at least one gameweek",
            });
        }
        self.warehouse.validate()?;
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://")
        {
            return Err(ConfigError::Invalid {
                key: "FPL_API_BASE_URL",
                value: self.api.base_url.clone(),
                reason: "expected an http(s) url",
            });
        }
        Ok(())
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`, the shape accepted for dataset and table names.
pub fn is_valid_identifier(raw: &str) -> bool {
    let mut chars = raw.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

/// Schema names every sqlite connection already owns; a dataset cannot be
/// attached under them.
pub fn is_reserved_schema(raw: &str) -> bool {
    raw.eq_ignore_ascii_case("main") || raw.eq_ignore_ascii_case("temp")
}

fn default_warehouse_dir<F>(lookup: &F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(base) = lookup("XDG_DATA_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(APP_DIR));
    }
    let home = lookup("HOME")?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".local").join("share").join(APP_DIR))
}

fn parse_number<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse::<T>().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.to_string(),
        reason: "expected a non-negative integer",
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_fill_everything_but_the_league() {
        let config = PipelineConfig::from_lookup(lookup_from(&[
            ("FPL_LEAGUE_ID", "4193"),
            ("HOME", "/home/u"),
        ]))
        .unwrap();
        assert_eq!(config.league_id, 4193);
        assert_eq!(config.season_gameweeks, 38);
        assert_eq!(config.api.base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.warehouse.dataset_id, "fpl_draft_data");
        assert_eq!(config.warehouse.location, "EU");
        assert_eq!(
            config.warehouse.dir,
            PathBuf::from("/home/u/.local/share/fpl_draft_warehouse")
        );
        assert_eq!(
            config.warehouse.dataset_path(),
            PathBuf::from("/home/u/.local/share/fpl_draft_warehouse/fpl_draft_data.sqlite")
        );
    }

    #[test]
    fn overrides_are_read() {
        let config = PipelineConfig::from_lookup(lookup_from(&[
            ("FPL_LEAGUE_ID", "24706"),
            ("FPL_SEASON_GAMEWEEKS", "34"),
            ("FPL_REQUEST_TIMEOUT_SECS", "3"),
            ("WAREHOUSE_DIR", "/data/wh"),
            ("WAREHOUSE_DATASET_ID", "league_24706"),
            ("WAREHOUSE_LOCATION", "US"),
        ]))
        .unwrap();
        assert_eq!(config.season_gameweeks, 34);
        assert_eq!(config.api.timeout, Duration::from_secs(3));
        assert_eq!(config.warehouse.dir, PathBuf::from("/data/wh"));
        assert_eq!(config.warehouse.dataset_id, "league_24706");
        assert_eq!(config.warehouse.location, "US");
    }

    #[test]
    fn missing_league_is_rejected() {
        let err = PipelineConfig::from_lookup(lookup_from(&[("HOME", "/h")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("FPL_LEAGUE_ID")));
    }

    #[test]
    fn bad_values_are_rejected() {
        let err = PipelineConfig::from_lookup(lookup_from(&[
            ("FPL_LEAGUE_ID", "abc"),
            ("HOME", "/h"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "FPL_LEAGUE_ID", .. }));

        let err = PipelineConfig::from_lookup(lookup_from(&[
            ("FPL_LEAGUE_ID", "1"),
            ("FPL_SEASON_GAMEWEEKS", "0"),
            ("HOME", "/h"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "FPL_SEASON_GAMEWEEKS", .. }));

        let err = PipelineConfig::from_lookup(lookup_from(&[
            ("FPL_LEAGUE_ID", "1"),
            ("WAREHOUSE_DATASET_ID", "drop table;"),
            ("HOME", "/h"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "WAREHOUSE_DATASET_ID", .. }));
    }

    #[test]
    fn identifier_shape() {
        assert!(is_valid_identifier("fpl_draft_data"));
        assert!(is_valid_identifier("_x1"));
        assert!(!is_valid_identifier("1abc"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("a-b"));
    }

    #[test]
    fn reserved_schema_names_are_rejected() {
        for name in ["main", "temp", "MAIN", "Temp"] {
            let err = PipelineConfig::from_lookup(lookup_from(&[
                ("FPL_LEAGUE_ID", "1"),
                ("WAREHOUSE_DATASET_ID", name),
                ("HOME", "/h"),
            ]))
            .unwrap_err();
            assert!(
                matches!(err, ConfigError::Invalid { key: "WAREHOUSE_DATASET_ID", .. }),
                "{name}"
            );
            assert!(WarehouseConfig::new("/wh", name).validate().is_err());
        }
        assert!(!is_reserved_schema("maintenance"));
        assert!(WarehouseConfig::new("/wh", "fpl_draft_data").validate().is_ok());
    }
}
