//! Periodic deletion of aged rows.

use crate::error::StoreError;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::info;

/// Rows removed by one sweep.
#[derive(Debug, Clone, Copy, Default)]
pub struct SweepReport {
    pub snapshots_deleted: u64,
    pub factor_records_deleted: u64,
    pub summaries_deleted: u64,
}

#[derive(Clone)]
pub struct RetentionSweeper {
    pool: PgPool,
    retention_days: i64,
}

impl RetentionSweeper {
    #[must_use]
    pub fn new(pool: PgPool, retention_days: i64) -> Self {
        Self {
            pool,
            retention_days,
        }
    }

    /// Deletes rows older than the retention horizon.
    ///
    /// A symbol's most recent snapshot is always kept, even when it is older
    /// than the horizon, so a delisted symbol still has a last-known state.
    ///
    /// # Errors
    /// Returns an error if any delete statement fails.
    pub async fn sweep(&self) -> Result<SweepReport, StoreError> {
        let cutoff = Utc::now() - Duration::days(self.retention_days);

        let aged: Vec<(String, DateTime<Utc>)> =
            sqlx::query_as("SELECT symbol, timestamp FROM snapshots WHERE timestamp < $1")
                .bind(cutoff)
                .fetch_all(&self.pool)
                .await?;
        let newest: HashMap<String, DateTime<Utc>> =
            sqlx::query_as::<_, (String, Option<DateTime<Utc>>)>(
                "SELECT symbol, MAX(timestamp) FROM snapshots GROUP BY symbol",
            )
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .filter_map(|(symbol, ts)| ts.map(|t| (symbol, t)))
            .collect();

        let doomed = deletable_snapshots(&aged, &newest);
        let snapshots = if doomed.is_empty() {
            0
        } else {
            let (symbols, timestamps): (Vec<String>, Vec<DateTime<Utc>>) =
                doomed.into_iter().unzip();
            sqlx::query(
                r"
                DELETE FROM snapshots
                WHERE (symbol, timestamp) IN (
                    SELECT * FROM UNNEST($1::text[], $2::timestamptz[])
                )
                ",
            )
            .bind(&symbols)
            .bind(&timestamps)
            .execute(&self.pool)
            .await?
            .rows_affected()
        };

        let factor_records = sqlx::query("DELETE FROM factor_records WHERE timestamp < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?
            .rows_affected();

        let summaries = sqlx::query("DELETE FROM summaries WHERE timestamp < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?
            .rows_affected();

        let report = SweepReport {
            snapshots_deleted: snapshots,
            factor_records_deleted: factor_records,
            summaries_deleted: summaries,
        };

        info!(
            snapshots = report.snapshots_deleted,
            factor_records = report.factor_records_deleted,
            summaries = report.summaries_deleted,
            retention_days = self.retention_days,
            "Retention sweep complete"
        );

        Ok(report)
    }
}

/// Aged rows minus each symbol's newest snapshot.
///
/// A delisted symbol whose every row is past the horizon still keeps its
/// last-known state; deleting by exact (symbol, timestamp) pairs keeps the
/// sweep safe against rows inserted after the selection.
fn deletable_snapshots(
    aged: &[(String, DateTime<Utc>)],
    newest: &HashMap<String, DateTime<Utc>>,
) -> Vec<(String, DateTime<Utc>)> {
    aged.iter()
        .filter(|(symbol, ts)| newest.get(symbol) != Some(ts))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_delisted_symbol_keeps_its_newest_snapshot() {
        // Every row is past the horizon; the newest survives anyway.
        let aged = vec![
            ("DEADUSDT".to_string(), t(0)),
            ("DEADUSDT".to_string(), t(1)),
            ("DEADUSDT".to_string(), t(2)),
        ];
        let newest = HashMap::from([("DEADUSDT".to_string(), t(2))]);
        let doomed = deletable_snapshots(&aged, &newest);
        assert_eq!(doomed.len(), 2);
        assert!(!doomed.contains(&("DEADUSDT".to_string(), t(2))));
    }

    #[test]
    fn test_active_symbol_deletes_every_aged_row() {
        let aged = vec![("BTCUSDT".to_string(), t(0)), ("BTCUSDT".to_string(), t(1))];
        // The newest row is recent and never appears in the aged set.
        let newest = HashMap::from([("BTCUSDT".to_string(), t(12))]);
        assert_eq!(deletable_snapshots(&aged, &newest).len(), 2);
    }

    #[test]
    fn test_mixed_symbols_swept_independently() {
        let aged = vec![
            ("DEADUSDT".to_string(), t(3)),
            ("BTCUSDT".to_string(), t(0)),
        ];
        let newest = HashMap::from([
            ("DEADUSDT".to_string(), t(3)),
            ("BTCUSDT".to_string(), t(12)),
        ]);
        let doomed = deletable_snapshots(&aged, &newest);
        assert_eq!(doomed, vec![("BTCUSDT".to_string(), t(0))]);
    }
}
