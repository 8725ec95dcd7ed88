pub mod config;
pub mod health;
pub mod ingest;
pub mod query;
pub mod sessions;
