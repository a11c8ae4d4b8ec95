pub mod config;
pub mod errors;
pub mod host;
pub mod models;
pub mod parsers;
pub mod services;

pub use config::{DialectConfig, IngestConfig, Settings};
pub use errors::{ConfigError, HostError, IngestError};
pub use host::{Host, IssueSink, MeasureTarget, MetricSink, RuleCatalog};
pub use services::ingestion::{ingest_all, run_dialect};
