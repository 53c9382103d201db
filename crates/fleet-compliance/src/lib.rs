pub mod compliance;
pub mod config;
pub mod error;
pub mod ingest;
pub mod platform;
pub mod retry;
pub mod telemetry;
pub mod tenancy;
