//! Summary audit log and dedup gate state.
//!
//! The dedup decision is a read-modify-write on a single-row table. The gate
//! holds the row lock from `begin_gate` until commit or rollback, so only one
//! writer at a time can compare against and advance the last-sent hash.

use crate::error::StoreError;
use crate::models::SummaryRecord;
use sqlx::{PgPool, Postgres, Transaction};

/// An open gate transaction holding the `dedup_state` row lock.
pub struct GateTransaction<'a> {
    tx: Transaction<'a, Postgres>,
    last_sent_hash: Option<String>,
}

impl GateTransaction<'_> {
    /// The fingerprint of the most recently delivered digest, if any.
    #[must_use]
    pub fn last_sent_hash(&self) -> Option<&str> {
        self.last_sent_hash.as_deref()
    }

    /// Records the cycle's summary row and, when `advance_hash` is set,
    /// updates the last-sent fingerprint. The hash advances only for a
    /// delivered digest; a suppressed or failed send leaves it untouched.
    ///
    /// # Errors
    /// Returns an error if any statement or the commit fails.
    pub async fn finish(
        mut self,
        record: &SummaryRecord,
        advance_hash: bool,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO summaries (timestamp, content_hash, full_text, sent)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(record.timestamp)
        .bind(&record.content_hash)
        .bind(&record.full_text)
        .bind(record.sent)
        .execute(&mut *self.tx)
        .await?;

        if advance_hash {
            sqlx::query("UPDATE dedup_state SET last_sent_hash = $1 WHERE id = 1")
                .bind(&record.content_hash)
                .execute(&mut *self.tx)
                .await?;
        }

        self.tx.commit().await?;
        Ok(())
    }

    /// Abandons the gate without recording anything.
    ///
    /// # Errors
    /// Returns an error if the rollback fails.
    pub async fn abort(self) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct SummaryRepository {
    pool: PgPool,
}

impl SummaryRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens the gate: starts a serializable transaction and locks the
    /// `dedup_state` row, returning the last-sent fingerprint.
    ///
    /// # Errors
    /// Returns an error if the transaction cannot be opened or the row
    /// cannot be read.
    pub async fn begin_gate(&self) -> Result<GateTransaction<'static>, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;

        let row: (Option<String>,) =
            sqlx::query_as("SELECT last_sent_hash FROM dedup_state WHERE id = 1 FOR UPDATE")
                .fetch_one(&mut *tx)
                .await?;

        Ok(GateTransaction {
            tx,
            last_sent_hash: row.0,
        })
    }

    /// Recent summary records, newest first.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn history(&self, limit: i64) -> Result<Vec<SummaryRecord>, StoreError> {
        let rows = sqlx::query_as::<_, SummaryRecord>(
            r"
            SELECT id, timestamp, content_hash, full_text, sent
            FROM summaries
            ORDER BY timestamp DESC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
