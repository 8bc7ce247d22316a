pub mod factor;
pub mod snapshot;
pub mod summary;
pub mod universe;

pub use factor::FactorRecord;
pub use snapshot::Snapshot;
pub use summary::SummaryRecord;
pub use universe::UniverseEntry;
