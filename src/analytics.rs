use rusqlite::{Row as SqlRow, params};
use serde::Serialize;

use crate::error::WarehouseError;
use crate::pipeline::tables;
use crate::warehouse::SqliteWarehouse;

pub const TOP_TRANSFERS_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StandingRow {
    pub entry_id: i64,
    pub manager_name: Option<String>,
    pub total_points: i64,
    pub rank: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MomentumRow {
    pub entry_id: i64,
    pub manager_name: Option<String>,
    pub total_points_last_4_gw: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchPointsRow {
    pub entry_id: i64,
    pub manager_name: Option<String>,
    pub bench_points: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContributionRow {
    pub entry_id: i64,
    pub manager_name: Option<String>,
    pub element_id: i64,
    pub web_name: Option<String>,
    pub team_short_name: Option<String>,
    pub position: Option<String>,
    pub total_points: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsistencyRow {
    pub gameweek: i64,
    pub entry_id: i64,
    pub manager_name: Option<String>,
    pub weekly_points: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftPickRow {
    pub manager_name: Option<String>,
    pub pick: Option<i64>,
    pub round: Option<i64>,
    pub element_id: Option<i64>,
    pub player_name: Option<String>,
    pub total_points_contributed: i64,
    pub pick_bucket: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferRow {
    pub player_name: Option<String>,
    pub manager_name: Option<String>,
    pub entry_id: i64,
    pub element_id: i64,
    pub total_points: i64,
}

pub struct LeagueAnalytics<'a> {
    warehouse: &'a SqliteWarehouse,
}

impl<'a> LeagueAnalytics<'a> {
    pub fn new(warehouse: &'a SqliteWarehouse) -> Self {
        Self { warehouse }
    }

    pub fn standings(&self) -> Result<Vec<StandingRow>, WarehouseError> {
        let sql = format!(
            "SELECT entry_id, manager_name, total_points, rank FROM {} ORDER BY rank, entry_id",
            self.warehouse.qualified("agg_league_standings")?
        );
        self.collect(&sql, |row| {
            Ok(StandingRow {
                entry_id: row.get(0)?,
                manager_name: row.get(1)?,
                total_points: row.get(2)?,
                rank: row.get(3)?,
            })
        })
    }

    pub fn momentum(&self) -> Result<Vec<MomentumRow>, WarehouseError> {
        let sql = format!(
            "SELECT entry_id, manager_name, total_points_last_4_gw FROM {} \
             ORDER BY total_points_last_4_gw DESC, entry_id",
            self.warehouse.qualified("agg_manager_momentum")?
        );
        self.collect(&sql, |row| {
            Ok(MomentumRow {
                entry_id: row.get(0)?,
                manager_name: row.get(1)?,
                total_points_last_4_gw: row.get(2)?,
            })
        })
    }

    pub fn bench_points(&self) -> Result<Vec<BenchPointsRow>, WarehouseError> {
        let sql = format!(
            "SELECT entry_id, manager_name, bench_points FROM {} ORDER BY bench_points DESC, entry_id",
            self.warehouse.qualified("agg_bench_points")?
        );
        self.collect(&sql, |row| {
            Ok(BenchPointsRow {
                entry_id: row.get(0)?,
                manager_name: row.get(1)?,
                bench_points: row.get(2)?,
            })
        })
    }

    pub fn contributions(
        &self,
        manager: Option<&str>,
    ) -> Result<Vec<ContributionRow>, WarehouseError> {
        let sql = format!(
            "SELECT entry_id, manager_name, element_id, web_name, team_short_name, position, total_points \
             FROM {} WHERE ?1 IS NULL OR manager_name = ?1 \
             ORDER BY total_points DESC, entry_id, element_id",
            self.warehouse.qualified("agg_player_contribution")?
        );
        let mut stmt = self.warehouse.connection().prepare(&sql)?;
        let rows = stmt.query_map(params![manager], contribution_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn consistency(&self) -> Result<Vec<ConsistencyRow>, WarehouseError> {
        let sql = format!(
            "SELECT gameweek, entry_id, manager_name, weekly_points FROM {} ORDER BY entry_id, gameweek",
            self.warehouse.qualified("agg_manager_consistency")?
        );
        self.collect(&sql, |row| {
            Ok(ConsistencyRow {
                gameweek: row.get(0)?,
                entry_id: row.get(1)?,
                manager_name: row.get(2)?,
                weekly_points: row.get(3)?,
            })
        })
    }

    pub fn draft_analysis(&self) -> Result<Vec<DraftPickRow>, WarehouseError> {
        let sql = format!(
            "SELECT manager_name, pick, round, element_id, player_name, total_points_contributed, pick_bucket \
             FROM {} ORDER BY pick IS NULL, pick, total_points_contributed DESC, element_id",
            self.warehouse.qualified("agg_draft_picks_analysis")?
        );
        self.collect(&sql, |row| {
            Ok(DraftPickRow {
                manager_name: row.get(0)?,
                pick: row.get(1)?,
                round: row.get(2)?,
                element_id: row.get(3)?,
                player_name: row.get(4)?,
                total_points_contributed: row.get(5)?,
                pick_bucket: row.get(6)?,
            })
        })
    }

    pub fn top_transfers(&self, limit: usize) -> Result<Vec<TransferRow>, WarehouseError> {
        let sql = format!(
            "SELECT player_name, manager_name, entry_id, element_id, total_points FROM {} \
             ORDER BY total_points DESC, entry_id, element_id LIMIT ?1",
            self.warehouse.qualified("agg_top_transfers")?
        );
        let mut stmt = self.warehouse.connection().prepare(&sql)?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(TransferRow {
                player_name: row.get(0)?,
                manager_name: row.get(1)?,
                entry_id: row.get(2)?,
                element_id: row.get(3)?,
                total_points: row.get(4)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn entry_count(&self) -> Result<i64, WarehouseError> {
        self.warehouse.row_count(tables::DIM_ENTRIES)
    }

    fn collect<T, F>(&self, sql: &str, map: F) -> Result<Vec<T>, WarehouseError>
    where
        F: FnMut(&SqlRow<'_>) -> rusqlite::Result<T>,
    {
        let mut stmt = self.warehouse.connection().prepare(sql)?;
        let rows = stmt.query_map([], map)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

fn contribution_row(row: &SqlRow<'_>) -> rusqlite::Result<ContributionRow> {
    Ok(ContributionRow {
        entry_id: row.get(0)?,
        manager_name: row.get(1)?,
        element_id: row.get(2)?,
        web_name: row.get(3)?,
        team_short_name: row.get(4)?,
        position: row.get(5)?,
        total_points: row.get(6)?,
    })
}
