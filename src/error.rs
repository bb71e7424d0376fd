use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("unable to resolve a warehouse directory (set WAREHOUSE_DIR or HOME)")]
    NoWarehouseDir,
}

#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("create warehouse dir {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid identifier {0:?}")]
    InvalidIdentifier(String),

    #[error("dataset {0} is not attached; call ensure_dataset first")]
    DatasetNotAttached(String),

    #[error("row-set for {0} has no columns")]
    EmptySchema(String),
}

/// Errors that stop an ingestion run.
///
/// Degraded fetches and unrecognized week markers never show up here; they
/// are reported on the run summary instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("could not ensure dataset: {0}")]
    Dataset(#[source] WarehouseError),

    #[error("static metadata unavailable ({0}); aborting run")]
    StaticMetadataUnavailable(String),

    #[error("load into {table} failed: {source}")]
    Load {
        table: String,
        #[source]
        source: WarehouseError,
    },
}
