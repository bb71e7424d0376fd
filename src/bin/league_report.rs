use anyhow::{Context, Result};
use serde_json::json;

use fpl_draft_warehouse::analytics::{LeagueAnalytics, TOP_TRANSFERS_LIMIT};
use fpl_draft_warehouse::cli::{arg_value, db_dir_arg, has_flag};
use fpl_draft_warehouse::config::WarehouseConfig;
use fpl_draft_warehouse::logging::init_tracing;
use fpl_draft_warehouse::{SqliteWarehouse, Warehouse};

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    init_tracing();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut config = WarehouseConfig::from_env().context("load warehouse configuration")?;
    if let Some(dir) = db_dir_arg(&args) {
        config = config.with_dir(&dir);
    }
    let manager = arg_value(&args, "--manager");

    let mut warehouse = SqliteWarehouse::open(&config)
        .with_context(|| format!("open warehouse at {}", config.dir.display()))?;
    warehouse
        .ensure_dataset()
        .with_context(|| format!("ensure dataset {}", config.dataset_id))?;

    let analytics = LeagueAnalytics::new(&warehouse);
    let entries = analytics.entry_count().context("count league entries")?;
    let standings = analytics.standings().context("read standings")?;
    let momentum = analytics.momentum().context("read momentum")?;
    let bench = analytics.bench_points().context("read bench points")?;
    let contributions = analytics
        .contributions(manager.as_deref())
        .context("read player contributions")?;
    let transfers = analytics
        .top_transfers(TOP_TRANSFERS_LIMIT)
        .context("read top transfers")?;

    if has_flag(&args, "--json") {
        let consistency = analytics.consistency().context("read consistency")?;
        let draft = analytics.draft_analysis().context("read draft analysis")?;
        let report = json!({
            "dataset": config.dataset_id,
            "entries": entries,
            "standings": standings,
            "momentum": momentum,
            "bench_points": bench,
            "contributions": contributions,
            "consistency": consistency,
            "draft_analysis": draft,
            "top_transfers": transfers,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Dataset: {} ({entries} entries)", config.dataset_id);
    println!("Standings");
    for row in &standings {
        println!(
            "  {:>2}. {:<28} {:>5}",
            row.rank,
            row.manager_name.as_deref().unwrap_or("?"),
            row.total_points
        );
    }
    println!("Last 4 gameweeks");
    for row in &momentum {
        println!(
            "  {:<28} {:>5}",
            row.manager_name.as_deref().unwrap_or("?"),
            row.total_points_last_4_gw
        );
    }
    println!("Bench points");
    for row in &bench {
        println!(
            "  {:<28} {:>5}",
            row.manager_name.as_deref().unwrap_or("?"),
            row.bench_points
        );
    }
    match manager.as_deref() {
        Some(name) => println!("Top contributors for {name}"),
        None => println!("Top contributors"),
    }
    for row in contributions.iter().take(10) {
        println!(
            "  {:<20} {:<4} {:<4} {:>5}  ({})",
            row.web_name.as_deref().unwrap_or("?"),
            row.team_short_name.as_deref().unwrap_or("-"),
            row.position.as_deref().unwrap_or("-"),
            row.total_points,
            row.manager_name.as_deref().unwrap_or("?")
        );
    }
    println!("Top transfers");
    for row in &transfers {
        println!(
            "  {:<20} {:>5}  ({})",
            row.player_name.as_deref().unwrap_or("?"),
            row.total_points,
            row.manager_name.as_deref().unwrap_or("?")
        );
    }
    Ok(())
}
