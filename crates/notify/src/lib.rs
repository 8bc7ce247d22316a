//! Digest rendering and delivery.
//!
//! The renderer turns a classified cross-section into digest text; the
//! fingerprint module coarsens that text into a content hash; the gate
//! decides send-vs-suppress against the last delivered hash under a
//! single-writer transaction.

pub mod fingerprint;
pub mod gate;
pub mod summary;
pub mod telegram;

pub use fingerprint::content_hash;
pub use gate::{DedupGate, GateOutcome, GateState, GateStore};
pub use summary::render_digest;
pub use telegram::{LogSink, TelegramNotifier};
