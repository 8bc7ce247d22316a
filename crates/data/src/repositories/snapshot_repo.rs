//! Append-only snapshot persistence.

use crate::error::StoreError;
use crate::models::Snapshot;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

/// Controls what happens when an incoming snapshot collides with an
/// existing (exchange, symbol, timestamp) key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Reject the write with `StoreError::Duplicate`.
    Strict,
    /// Overwrite the existing row; used for explicit historical corrections
    /// and for the refetch window of the hourly cycle.
    BackfillOverwrite,
}

#[derive(Clone)]
pub struct SnapshotRepository {
    pool: PgPool,
}

impl SnapshotRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Persists one snapshot, validating it first.
    ///
    /// Returns the row id of the written (or, under `Strict` with no
    /// conflict, newly inserted) snapshot.
    ///
    /// # Errors
    /// Returns `StoreError::Validation` on a malformed snapshot,
    /// `StoreError::Duplicate` on a key collision in `Strict` mode, or a
    /// database error.
    pub async fn insert(&self, snapshot: &Snapshot, mode: WriteMode) -> Result<i64, StoreError> {
        snapshot.validate()?;

        let conflict_clause = match mode {
            WriteMode::Strict => "DO NOTHING",
            WriteMode::BackfillOverwrite => {
                "DO UPDATE SET
                    contract_type = EXCLUDED.contract_type,
                    quote_asset = EXCLUDED.quote_asset,
                    price = EXCLUDED.price,
                    volume_1h = EXCLUDED.volume_1h,
                    volume_4h = EXCLUDED.volume_4h,
                    volume_24h = EXCLUDED.volume_24h,
                    open_interest = EXCLUDED.open_interest,
                    funding_rate = EXCLUDED.funding_rate,
                    mark_price = EXCLUDED.mark_price,
                    index_price = EXCLUDED.index_price"
            }
        };

        let sql = format!(
            r"
            INSERT INTO snapshots
                (exchange, symbol, contract_type, quote_asset, timestamp, price,
                 volume_1h, volume_4h, volume_24h, open_interest,
                 funding_rate, mark_price, index_price)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (exchange, symbol, timestamp) {conflict_clause}
            RETURNING id
            "
        );

        let row: Option<(i64,)> = sqlx::query_as(&sql)
            .bind(&snapshot.exchange)
            .bind(&snapshot.symbol)
            .bind(&snapshot.contract_type)
            .bind(&snapshot.quote_asset)
            .bind(snapshot.timestamp)
            .bind(snapshot.price)
            .bind(snapshot.volume_1h)
            .bind(snapshot.volume_4h)
            .bind(snapshot.volume_24h)
            .bind(snapshot.open_interest)
            .bind(snapshot.funding_rate)
            .bind(snapshot.mark_price)
            .bind(snapshot.index_price)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some((id,)) => Ok(id),
            // DO NOTHING suppressed the insert: the key already exists.
            None => Err(StoreError::Duplicate {
                exchange: snapshot.exchange.clone(),
                symbol: snapshot.symbol.clone(),
                timestamp: snapshot.timestamp.to_rfc3339(),
            }),
        }
    }

    /// Persists a batch inside one transaction. Validation failures abort
    /// the whole batch; duplicate keys follow `mode`.
    ///
    /// # Errors
    /// Returns the first validation, duplicate, or database error.
    pub async fn insert_batch(
        &self,
        snapshots: &[Snapshot],
        mode: WriteMode,
    ) -> Result<(), StoreError> {
        for snapshot in snapshots {
            snapshot.validate()?;
        }

        let mut tx = self.pool.begin().await?;
        for snapshot in snapshots {
            let result = sqlx::query(
                r"
                INSERT INTO snapshots
                    (exchange, symbol, contract_type, quote_asset, timestamp, price,
                     volume_1h, volume_4h, volume_24h, open_interest,
                     funding_rate, mark_price, index_price)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                ON CONFLICT (exchange, symbol, timestamp) DO UPDATE SET
                    contract_type = EXCLUDED.contract_type,
                    quote_asset = EXCLUDED.quote_asset,
                    price = EXCLUDED.price,
                    volume_1h = EXCLUDED.volume_1h,
                    volume_4h = EXCLUDED.volume_4h,
                    volume_24h = EXCLUDED.volume_24h,
                    open_interest = EXCLUDED.open_interest,
                    funding_rate = EXCLUDED.funding_rate,
                    mark_price = EXCLUDED.mark_price,
                    index_price = EXCLUDED.index_price
                WHERE $14::boolean
                ",
            )
            .bind(&snapshot.exchange)
            .bind(&snapshot.symbol)
            .bind(&snapshot.contract_type)
            .bind(&snapshot.quote_asset)
            .bind(snapshot.timestamp)
            .bind(snapshot.price)
            .bind(snapshot.volume_1h)
            .bind(snapshot.volume_4h)
            .bind(snapshot.volume_24h)
            .bind(snapshot.open_interest)
            .bind(snapshot.funding_rate)
            .bind(snapshot.mark_price)
            .bind(snapshot.index_price)
            .bind(mode == WriteMode::BackfillOverwrite)
            .execute(&mut *tx)
            .await?;

            if mode == WriteMode::Strict && result.rows_affected() == 0 {
                return Err(StoreError::Duplicate {
                    exchange: snapshot.exchange.clone(),
                    symbol: snapshot.symbol.clone(),
                    timestamp: snapshot.timestamp.to_rfc3339(),
                });
            }
        }
        tx.commit().await?;
        Ok(())
    }

    /// Fetches the newest `limit` snapshots for a symbol and returns them in
    /// ascending timestamp order, as every reader expects.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn newest_window(
        &self,
        symbol: &str,
        limit: i64,
    ) -> Result<Vec<Snapshot>, StoreError> {
        let mut rows = sqlx::query_as::<_, Snapshot>(
            r"
            SELECT id, exchange, symbol, contract_type, quote_asset, timestamp,
                   price, volume_1h, volume_4h, volume_24h, open_interest,
                   funding_rate, mark_price, index_price
            FROM snapshots
            WHERE symbol = $1
            ORDER BY timestamp DESC
            LIMIT $2
            ",
        )
        .bind(symbol)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.reverse();
        Ok(rows)
    }

    /// Snapshots for a symbol within `[start, end]`, ascending.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn range(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Snapshot>, StoreError> {
        let rows = sqlx::query_as::<_, Snapshot>(
            r"
            SELECT id, exchange, symbol, contract_type, quote_asset, timestamp,
                   price, volume_1h, volume_4h, volume_24h, open_interest,
                   funding_rate, mark_price, index_price
            FROM snapshots
            WHERE symbol = $1 AND timestamp >= $2 AND timestamp <= $3
            ORDER BY timestamp ASC
            ",
        )
        .bind(symbol)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// The most recent snapshot for a symbol, if any.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn latest(&self, symbol: &str) -> Result<Option<Snapshot>, StoreError> {
        let row = sqlx::query_as::<_, Snapshot>(
            r"
            SELECT id, exchange, symbol, contract_type, quote_asset, timestamp,
                   price, volume_1h, volume_4h, volume_24h, open_interest,
                   funding_rate, mark_price, index_price
            FROM snapshots
            WHERE symbol = $1
            ORDER BY timestamp DESC
            LIMIT 1
            ",
        )
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}
