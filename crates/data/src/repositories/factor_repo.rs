//! Factor record persistence and cross-sectional queries.

use crate::error::StoreError;
use crate::models::FactorRecord;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

#[derive(Clone)]
pub struct FactorRepository {
    pool: PgPool,
}

impl FactorRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Upserts a batch of factor records inside one transaction. Re-running
    /// a cycle replaces the previous records for the same cross-section.
    ///
    /// # Errors
    /// Returns an error if the transaction or any statement fails.
    pub async fn upsert_batch(&self, records: &[FactorRecord]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        for record in records {
            sqlx::query(
                r"
                INSERT INTO factor_records
                    (symbol, timestamp, momentum_1h, momentum_4h, momentum_24h,
                     momentum_percentile, meanrev_zscore, rsi_14,
                     carry_funding_annualized, carry_basis,
                     volume_momentum_1h, volume_momentum_4h, volume_momentum_24h,
                     volume_anomaly_zscore, volume_percentile, volume_price_divergence,
                     composite_score, is_outlier, outlier_type, computed_at,
                     source_snapshot_id)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                        $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21)
                ON CONFLICT (symbol, timestamp) DO UPDATE SET
                    momentum_1h = EXCLUDED.momentum_1h,
                    momentum_4h = EXCLUDED.momentum_4h,
                    momentum_24h = EXCLUDED.momentum_24h,
                    momentum_percentile = EXCLUDED.momentum_percentile,
                    meanrev_zscore = EXCLUDED.meanrev_zscore,
                    rsi_14 = EXCLUDED.rsi_14,
                    carry_funding_annualized = EXCLUDED.carry_funding_annualized,
                    carry_basis = EXCLUDED.carry_basis,
                    volume_momentum_1h = EXCLUDED.volume_momentum_1h,
                    volume_momentum_4h = EXCLUDED.volume_momentum_4h,
                    volume_momentum_24h = EXCLUDED.volume_momentum_24h,
                    volume_anomaly_zscore = EXCLUDED.volume_anomaly_zscore,
                    volume_percentile = EXCLUDED.volume_percentile,
                    volume_price_divergence = EXCLUDED.volume_price_divergence,
                    composite_score = EXCLUDED.composite_score,
                    is_outlier = EXCLUDED.is_outlier,
                    outlier_type = EXCLUDED.outlier_type,
                    computed_at = EXCLUDED.computed_at,
                    source_snapshot_id = EXCLUDED.source_snapshot_id
                ",
            )
            .bind(&record.symbol)
            .bind(record.timestamp)
            .bind(record.momentum_1h)
            .bind(record.momentum_4h)
            .bind(record.momentum_24h)
            .bind(record.momentum_percentile)
            .bind(record.meanrev_zscore)
            .bind(record.rsi_14)
            .bind(record.carry_funding_annualized)
            .bind(record.carry_basis)
            .bind(record.volume_momentum_1h)
            .bind(record.volume_momentum_4h)
            .bind(record.volume_momentum_24h)
            .bind(record.volume_anomaly_zscore)
            .bind(record.volume_percentile)
            .bind(record.volume_price_divergence)
            .bind(record.composite_score)
            .bind(record.is_outlier)
            .bind(&record.outlier_type)
            .bind(record.computed_at)
            .bind(record.source_snapshot_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// All records sharing one cross-section timestamp.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn cross_section(
        &self,
        timestamp: DateTime<Utc>,
    ) -> Result<Vec<FactorRecord>, StoreError> {
        let rows = sqlx::query_as::<_, FactorRecord>(
            r"
            SELECT * FROM factor_records
            WHERE timestamp = $1
            ORDER BY symbol ASC
            ",
        )
        .bind(timestamp)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// The most recent cross-section timestamp, if any records exist.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn latest_timestamp(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        let row: (Option<DateTime<Utc>>,) =
            sqlx::query_as("SELECT MAX(timestamp) FROM factor_records")
                .fetch_one(&self.pool)
                .await?;

        Ok(row.0)
    }

    /// Recent history for one symbol, newest first.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn history(
        &self,
        symbol: &str,
        limit: i64,
    ) -> Result<Vec<FactorRecord>, StoreError> {
        let rows = sqlx::query_as::<_, FactorRecord>(
            r"
            SELECT * FROM factor_records
            WHERE symbol = $1
            ORDER BY timestamp DESC
            LIMIT $2
            ",
        )
        .bind(symbol)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Outliers at a cross-section, highest absolute composite first.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn outliers(
        &self,
        timestamp: DateTime<Utc>,
    ) -> Result<Vec<FactorRecord>, StoreError> {
        let rows = sqlx::query_as::<_, FactorRecord>(
            r"
            SELECT * FROM factor_records
            WHERE timestamp = $1 AND is_outlier
            ORDER BY ABS(composite_score) DESC, symbol ASC
            ",
        )
        .bind(timestamp)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
