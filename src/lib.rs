pub mod analytics;
pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod gameweek;
pub mod http_client;
pub mod loader;
pub mod logging;
pub mod normalize;
pub mod pipeline;
pub mod views;
pub mod warehouse;

pub use api::{Endpoint, FetchOutcome, FplClient, UpstreamApi};
pub use config::PipelineConfig;
pub use error::{ConfigError, PipelineError, WarehouseError};
pub use pipeline::{IngestPipeline, IngestSummary};
pub use views::ViewMaterializer;
pub use warehouse::{SqliteWarehouse, Warehouse};
