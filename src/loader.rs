use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use tracing::info;

use crate::error::PipelineError;
use crate::normalize::RowSet;
use crate::warehouse::Warehouse;

pub const INGESTED_AT: &str = "ingested_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Written { rows: usize },
    /// Empty row-set; the warehouse was not touched.
    Skipped,
}

impl LoadOutcome {
    pub fn rows(&self) -> usize {
        match self {
            LoadOutcome::Written { rows } => *rows,
            LoadOutcome::Skipped => 0,
        }
    }
}

/// Overwrites tables with row-sets, stamping one ingestion time per run.
#[derive(Debug, Clone)]
pub struct Loader {
    stamp: String,
}

impl Loader {
    pub fn new(ingested_at: DateTime<Utc>) -> Self {
        Self {
            stamp: ingested_at.to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }

    pub fn load<W>(
        &self,
        warehouse: &mut W,
        table: &str,
        mut rows: RowSet,
    ) -> Result<LoadOutcome, PipelineError>
    where
        W: Warehouse + ?Sized,
    {
        if rows.is_empty() {
            info!(table, "skipping {table}: row-set is empty");
            return Ok(LoadOutcome::Skipped);
        }

        for row in &mut rows {
            row.insert(INGESTED_AT.to_string(), Value::String(self.stamp.clone()));
        }

        info!(
            table,
            rows = rows.len(),
            dataset = warehouse.dataset_id(),
            "loading"
        );
        let written = warehouse
            .write_truncate(table, &rows)
            .map_err(|source| PipelineError::Load {
                table: table.to_string(),
                source,
            })?;
        info!(table, rows = written, "loaded {table}");
        Ok(LoadOutcome::Written { rows: written })
    }
}
