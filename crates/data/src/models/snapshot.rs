//! Raw market observation model.
//!
//! Snapshots are immutable and keyed by (exchange, symbol, timestamp).
//! Corrections are written as new rows via the backfill-overwrite mode,
//! never edited in place by other paths.

use crate::error::StoreError;
use chrono::{DateTime, Timelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One hourly market observation for a symbol.
///
/// Fields added after the initial schema (`volume_4h`, `volume_24h`,
/// `open_interest`) are nullable so old rows read back without failing.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Snapshot {
    /// Database-assigned row id; `None` until persisted.
    #[sqlx(default)]
    pub id: Option<i64>,
    pub exchange: String,
    pub symbol: String,
    /// "perpetual" or "spot".
    pub contract_type: String,
    pub quote_asset: String,
    /// Hour-aligned observation time.
    pub timestamp: DateTime<Utc>,
    /// Close price of the hour.
    pub price: Decimal,
    /// Volume traded during the hour.
    pub volume_1h: Decimal,
    pub volume_4h: Option<Decimal>,
    pub volume_24h: Option<Decimal>,
    pub open_interest: Option<Decimal>,
    /// Per-period funding rate as a fraction; null for spot-only symbols.
    pub funding_rate: Option<Decimal>,
    pub mark_price: Option<Decimal>,
    pub index_price: Option<Decimal>,
}

impl Snapshot {
    /// Validates the snapshot before it is written.
    ///
    /// # Errors
    /// Returns `StoreError::Validation` on empty key fields, a non-positive
    /// price, or a timestamp that is not aligned to the top of an hour.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.exchange.is_empty() {
            return Err(StoreError::Validation("exchange is empty".to_string()));
        }
        if self.symbol.is_empty() {
            return Err(StoreError::Validation("symbol is empty".to_string()));
        }
        if self.price <= Decimal::ZERO {
            return Err(StoreError::Validation(format!(
                "price must be positive, got {}",
                self.price
            )));
        }
        if self.timestamp.minute() != 0 || self.timestamp.second() != 0 {
            return Err(StoreError::Validation(format!(
                "timestamp {} is not hour-aligned",
                self.timestamp
            )));
        }
        Ok(())
    }
}
