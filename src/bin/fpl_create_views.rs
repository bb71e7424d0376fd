use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use fpl_draft_warehouse::cli::{arg_value, db_dir_arg};
use fpl_draft_warehouse::config::WarehouseConfig;
use fpl_draft_warehouse::logging::init_tracing;
use fpl_draft_warehouse::{SqliteWarehouse, ViewMaterializer, Warehouse};

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    init_tracing();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut config = WarehouseConfig::from_env().context("load warehouse configuration")?;
    if let Some(dir) = db_dir_arg(&args) {
        config = config.with_dir(&dir);
    }

    let mut warehouse = SqliteWarehouse::open(&config)
        .with_context(|| format!("open warehouse at {}", config.dir.display()))?;
    warehouse
        .ensure_dataset()
        .with_context(|| format!("ensure dataset {}", config.dataset_id))?;

    let mut materializer = ViewMaterializer::new(&mut warehouse);
    let report = match arg_value(&args, "--script").map(PathBuf::from) {
        Some(path) => {
            let script = fs::read_to_string(&path)
                .with_context(|| format!("read sql script {}", path.display()))?;
            materializer.materialize_script(&script)
        }
        None => materializer.materialize_default_views(),
    };

    println!("Dataset: {}", config.dataset_id);
    for name in &report.succeeded {
        println!("  ok     {name}");
    }
    for failure in &report.failed {
        println!("  failed {}: {}", failure.label, failure.error);
    }
    if !report.is_clean() {
        return Err(anyhow!("{} statement(s) failed", report.failed.len()));
    }
    Ok(())
}
