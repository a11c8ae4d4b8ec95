//! Ingestion services.

pub mod deduplication;
pub mod fingerprint;
pub mod ingestion;
pub mod locator;
pub mod metrics;
pub mod normalizer;
pub mod reporter;
