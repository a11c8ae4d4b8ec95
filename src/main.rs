use mimalloc::MiMalloc;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cxxreports::config::{IngestConfig, Settings, KNOWN_RULES_KEY};
use cxxreports::host::{Host, MemoryCatalog, MemoryIssueStore, MemoryMetricStore};
use cxxreports::ingest_all;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // stdout carries the result document, logs go to stderr
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "cxxreports=info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let settings = Settings::from_env();
    let config = IngestConfig::resolve(&settings)?;
    if config.dialects.is_empty() {
        tracing::warn!("No report path configured for any dialect");
    }

    let catalog = MemoryCatalog::from_list(settings.get(KNOWN_RULES_KEY).unwrap_or_default());
    let mut issues = MemoryIssueStore::new();
    let mut measures = MemoryMetricStore::new();

    let mut host = Host::new(&catalog, &mut issues).with_metrics(&mut measures);
    let summaries = ingest_all(&config, &mut host)?;
    drop(host);

    let output = json!({
        "runs": summaries,
        "violations": issues.violations,
        "measures": measures,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
