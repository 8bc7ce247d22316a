pub mod factor_repo;
pub mod snapshot_repo;
pub mod summary_repo;
pub mod universe_repo;

pub use factor_repo::FactorRepository;
pub use snapshot_repo::{SnapshotRepository, WriteMode};
pub use summary_repo::{GateTransaction, SummaryRepository};
pub use universe_repo::UniverseRepository;
