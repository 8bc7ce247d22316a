//! Summary audit log model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One digest evaluation per pipeline cycle, sent or suppressed.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SummaryRecord {
    #[sqlx(default)]
    pub id: Option<i64>,
    pub timestamp: DateTime<Utc>,
    /// Coarsened content fingerprint, hex-encoded SHA-256.
    pub content_hash: String,
    pub full_text: String,
    /// True when the digest was delivered; false when suppressed as a
    /// duplicate or when delivery failed.
    pub sent: bool,
}
