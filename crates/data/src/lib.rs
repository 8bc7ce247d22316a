//! Time-series storage for the factor pipeline.
//!
//! This crate provides:
//! - Append-only snapshot store with duplicate rejection and an explicit
//!   backfill-overwrite mode
//! - Factor record persistence with cross-sectional queries
//! - Daily universe membership snapshots
//! - Summary audit log and the single-row dedup gate state
//! - Retention sweep that never deletes a symbol's most recent snapshot

pub mod database;
pub mod error;
pub mod models;
pub mod repositories;
pub mod retention;

pub use database::Database;
pub use error::StoreError;
pub use models::{FactorRecord, Snapshot, SummaryRecord, UniverseEntry};
pub use repositories::{
    FactorRepository, GateTransaction, SnapshotRepository, SummaryRepository, UniverseRepository,
    WriteMode,
};
pub use retention::{RetentionSweeper, SweepReport};
