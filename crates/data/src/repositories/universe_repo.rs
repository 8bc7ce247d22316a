//! Daily universe membership persistence.

use crate::error::StoreError;
use crate::models::UniverseEntry;
use chrono::NaiveDate;
use sqlx::PgPool;

#[derive(Clone)]
pub struct UniverseRepository {
    pool: PgPool,
}

impl UniverseRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Replaces the universe for `as_of_date` with the given entries,
    /// atomically. Earlier dates are untouched so membership history is
    /// queryable.
    ///
    /// # Errors
    /// Returns an error if the transaction or any statement fails.
    pub async fn replace_for_date(
        &self,
        as_of_date: NaiveDate,
        entries: &[UniverseEntry],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM universe_entries WHERE as_of_date = $1")
            .bind(as_of_date)
            .execute(&mut *tx)
            .await?;

        for entry in entries {
            sqlx::query(
                r"
                INSERT INTO universe_entries
                    (symbol, exchange, contract_type, quote_asset, quote_volume,
                     funding_cadence_hours, as_of_date)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ",
            )
            .bind(&entry.symbol)
            .bind(&entry.exchange)
            .bind(&entry.contract_type)
            .bind(&entry.quote_asset)
            .bind(entry.quote_volume)
            .bind(entry.funding_cadence_hours)
            .bind(as_of_date)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// The most recent date a universe was recorded for.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn latest_date(&self) -> Result<Option<NaiveDate>, StoreError> {
        let row: (Option<NaiveDate>,) =
            sqlx::query_as("SELECT MAX(as_of_date) FROM universe_entries")
                .fetch_one(&self.pool)
                .await?;

        Ok(row.0)
    }

    /// The universe as of its latest recorded date, ranked by quote volume.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn latest(&self) -> Result<Vec<UniverseEntry>, StoreError> {
        let rows = sqlx::query_as::<_, UniverseEntry>(
            r"
            SELECT symbol, exchange, contract_type, quote_asset, quote_volume,
                   funding_cadence_hours, as_of_date
            FROM universe_entries
            WHERE as_of_date = (SELECT MAX(as_of_date) FROM universe_entries)
            ORDER BY quote_volume DESC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
