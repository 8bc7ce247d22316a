//! Daily universe membership.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One symbol's membership in the tracked universe on a given day.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UniverseEntry {
    pub symbol: String,
    pub exchange: String,
    pub contract_type: String,
    pub quote_asset: String,
    /// 24h quote volume at selection time, used for ranking.
    pub quote_volume: Decimal,
    /// Funding interval in hours for perpetuals; null for spot.
    pub funding_cadence_hours: Option<i32>,
    pub as_of_date: NaiveDate,
}
