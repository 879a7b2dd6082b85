pub mod config;
pub mod ingestion;
pub mod sqlite_persistence;
pub mod warehouse;
