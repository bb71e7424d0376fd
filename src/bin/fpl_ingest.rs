use anyhow::{Context, Result, anyhow};

use fpl_draft_warehouse::cli::{db_dir_arg, has_flag};
use fpl_draft_warehouse::logging::init_tracing;
use fpl_draft_warehouse::{
    FplClient, IngestPipeline, PipelineConfig, SqliteWarehouse, ViewMaterializer,
};

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    init_tracing();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut config = PipelineConfig::from_env().context("load configuration")?;
    if let Some(dir) = db_dir_arg(&args) {
        config = config.with_warehouse_dir(&dir);
    }

    let client = FplClient::new(&config.api).context("build http client")?;
    let mut warehouse = SqliteWarehouse::open(&config.warehouse).with_context(|| {
        format!("open warehouse at {}", config.warehouse.dir.display())
    })?;

    let summary = IngestPipeline::new(&config, &client, &mut warehouse)
        .run()
        .context("ingestion run failed")?;

    println!("Ingestion complete");
    println!("Warehouse: {}", config.warehouse.dir.display());
    println!("Dataset: {} ({:?})", config.warehouse.dataset_id, summary.dataset);
    println!("API: {}", client.base_url());
    println!("League: {}", config.league_id);
    println!(
        "Gameweeks: {}..={} ({})",
        summary.gameweeks.first(),
        summary.gameweeks.last(),
        summary.gameweeks.resolved_by()
    );
    println!("Entries: {}", summary.entry_ids.len());
    for load in &summary.tables {
        println!("  {:<20} rows={}", load.table, load.outcome.rows());
    }
    let skipped = summary.skipped_tables();
    if !skipped.is_empty() {
        println!("Skipped (empty): {}", skipped.join(", "));
    }
    if !summary.degraded.is_empty() {
        println!("Degraded fetches: {}", summary.degraded.len());
        for item in summary.degraded.iter().take(10) {
            println!("   - {} ({})", item.endpoint, item.reason);
        }
    }

    if has_flag(&args, "--views") {
        let report = ViewMaterializer::new(&mut warehouse).materialize_default_views();
        println!(
            "Views: {} created, {} failed",
            report.succeeded.len(),
            report.failed.len()
        );
        for failure in &report.failed {
            println!("   - {}: {}", failure.label, failure.error);
        }
        if !report.is_clean() {
            return Err(anyhow!("{} view(s) failed", report.failed.len()));
        }
    }

    Ok(())
}
