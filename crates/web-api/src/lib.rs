//! Read-only REST API over the factor store.

pub mod handlers;
pub mod server;

pub use server::{ApiServer, AppState};
