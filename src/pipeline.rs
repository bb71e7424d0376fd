use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{info, warn};

use crate::api::{EmptyReason, Endpoint, FetchOutcome, UpstreamApi};
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::gameweek::{GameweekRange, resolve_gameweeks};
use crate::loader::{LoadOutcome, Loader};
use crate::normalize::{
    RowSet, entry_ids, normalize_bootstrap, normalize_draft_choices, normalize_entry_picks,
    normalize_league_entries, normalize_live_stats,
};
use crate::warehouse::{DatasetStatus, Warehouse};

pub mod tables {
    pub const DIM_ELEMENTS: &str = "dim_elements";
    pub const DIM_TEAMS: &str = "dim_teams";
    pub const DIM_ELEMENT_TYPES: &str = "dim_element_types";
    pub const DIM_ENTRIES: &str = "dim_entries";
    pub const FACT_DRAFT_PICKS: &str = "fact_draft_picks";
    pub const FACT_GAMEWEEK_LIVE: &str = "fact_gameweek_live";
    pub const FACT_ENTRY_WEEKLY: &str = "fact_entry_weekly";

    pub const ALL: [&str; 7] = [
        DIM_ELEMENTS,
        DIM_TEAMS,
        DIM_ELEMENT_TYPES,
        DIM_ENTRIES,
        FACT_DRAFT_PICKS,
        FACT_GAMEWEEK_LIVE,
        FACT_ENTRY_WEEKLY,
    ];
}

#[derive(Debug, Clone, PartialEq)]
pub struct DegradedFetch {
    pub endpoint: Endpoint,
    pub reason: EmptyReason,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableLoad {
    pub table: &'static str,
    pub outcome: LoadOutcome,
}

#[derive(Debug, Clone)]
pub struct IngestSummary {
    pub dataset: DatasetStatus,
    pub ingested_at: DateTime<Utc>,
    pub gameweeks: GameweekRange,
    pub entry_ids: Vec<i64>,
    pub tables: Vec<TableLoad>,
    pub degraded: Vec<DegradedFetch>,
}

impl IngestSummary {
    pub fn rows_loaded(&self, table: &str) -> Option<usize> {
        self.tables
            .iter()
            .find(|t| t.table == table)
            .map(|t| t.outcome.rows())
    }

    pub fn skipped_tables(&self) -> Vec<&'static str> {
        self.tables
            .iter()
            .filter(|t| t.outcome == LoadOutcome::Skipped)
            .map(|t| t.table)
            .collect()
    }

    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|t| t.outcome.rows()).sum()
    }
}

pub struct IngestPipeline<'a, A: ?Sized, W: ?Sized> {
    config: &'a PipelineConfig,
    api: &'a A,
    warehouse: &'a mut W,
}

impl<'a, A, W> IngestPipeline<'a, A, W>
where
    A: UpstreamApi + ?Sized,
    W: Warehouse + ?Sized,
{
    pub fn new(config: &'a PipelineConfig, api: &'a A, warehouse: &'a mut W) -> Self {
        Self {
            config,
            api,
            warehouse,
        }
    }

    pub fn run(&mut self) -> Result<IngestSummary, PipelineError> {
        self.run_at(Utc::now())
    }

    /// Same as [`run`](Self::run) with a fixed ingestion timestamp.
    pub fn run_at(&mut self, ingested_at: DateTime<Utc>) -> Result<IngestSummary, PipelineError> {
        let dataset = self
            .warehouse
            .ensure_dataset()
            .map_err(PipelineError::Dataset)?;
        info!(
            dataset = self.warehouse.dataset_id(),
            status = ?dataset,
            league_id = self.config.league_id,
            "starting ingestion"
        );

        let loader = Loader::new(ingested_at);
        let mut loads = Vec::new();
        let mut degraded = Vec::new();

        info!("ingesting static data");
        let payload = match self.api.fetch(&Endpoint::BootstrapStatic) {
            FetchOutcome::Data(payload) => payload,
            FetchOutcome::Empty(reason) => {
                return Err(PipelineError::StaticMetadataUnavailable(reason.to_string()));
            }
        };
        let meta = normalize_bootstrap(&payload);
        if meta.elements.is_empty() {
            return Err(PipelineError::StaticMetadataUnavailable(
                "bootstrap payload has no elements".to_string(),
            ));
        }
        self.load(&loader, &mut loads, tables::DIM_ELEMENTS, meta.elements)?;
        self.load(&loader, &mut loads, tables::DIM_TEAMS, meta.teams)?;
        self.load(
            &loader,
            &mut loads,
            tables::DIM_ELEMENT_TYPES,
            meta.element_types,
        )?;

        let gameweeks = resolve_gameweeks(&meta.events, self.config.season_gameweeks);
        if gameweeks.is_fallback() {
            warn!(
                max_gameweek = gameweeks.last(),
                resolved_by = %gameweeks.resolved_by(),
                "could not determine current gameweek"
            );
        } else {
            info!(
                max_gameweek = gameweeks.last(),
                resolved_by = %gameweeks.resolved_by(),
                "resolved current gameweek"
            );
        }

        info!("ingesting league entries and draft picks");
        let league_id = self.config.league_id;
        let entries = self.fetch_rows(
            Endpoint::LeagueDetails { league_id },
            &mut degraded,
            normalize_league_entries,
        );
        let entry_ids = entry_ids(&entries);
        let choices = self.fetch_rows(
            Endpoint::DraftChoices { league_id },
            &mut degraded,
            normalize_draft_choices,
        );
        self.load(&loader, &mut loads, tables::DIM_ENTRIES, entries)?;
        self.load(&loader, &mut loads, tables::FACT_DRAFT_PICKS, choices)?;

        info!(
            gameweeks = gameweeks.last(),
            entries = entry_ids.len(),
            "ingesting weekly data"
        );
        let mut live_rows = Vec::new();
        let mut pick_rows = Vec::new();
        for gameweek in gameweeks.iter() {
            info!(gameweek, "processing gameweek {gameweek}");
            live_rows.extend(self.fetch_rows(
                Endpoint::EventLive { gameweek },
                &mut degraded,
                |payload| normalize_live_stats(payload, gameweek),
            ));
            for &entry_id in &entry_ids {
                pick_rows.extend(self.fetch_rows(
                    Endpoint::EntryEvent { entry_id, gameweek },
                    &mut degraded,
                    |payload| normalize_entry_picks(payload, entry_id, gameweek),
                ));
            }
        }

        self.load(&loader, &mut loads, tables::FACT_GAMEWEEK_LIVE, live_rows)?;
        self.load(&loader, &mut loads, tables::FACT_ENTRY_WEEKLY, pick_rows)?;

        let summary = IngestSummary {
            dataset,
            ingested_at,
            gameweeks,
            entry_ids,
            tables: loads,
            degraded,
        };
        info!(
            rows = summary.total_rows(),
            degraded = summary.degraded.len(),
            "ingestion complete"
        );
        Ok(summary)
    }

    fn fetch_rows<F>(
        &self,
        endpoint: Endpoint,
        degraded: &mut Vec<DegradedFetch>,
        normalize: F,
    ) -> RowSet
    where
        F: FnOnce(&Value) -> RowSet,
    {
        match self.api.fetch(&endpoint) {
            FetchOutcome::Data(payload) => normalize(&payload),
            FetchOutcome::Empty(reason) => {
                warn!(endpoint = %endpoint, %reason, "fetch returned no data");
                degraded.push(DegradedFetch { endpoint, reason });
                Vec::new()
            }
        }
    }

    fn load(
        &mut self,
        loader: &Loader,
        loads: &mut Vec<TableLoad>,
        table: &'static str,
        rows: RowSet,
    ) -> Result<(), PipelineError> {
        let outcome = loader.load(&mut *self.warehouse, table, rows)?;
        loads.push(TableLoad { table, outcome });
        Ok(())
    }
}
