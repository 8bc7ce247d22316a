//! Connection pool and schema bootstrap.

use crate::error::StoreError;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connects to the `PostgreSQL` database and prepares a pool.
    ///
    /// # Errors
    /// Returns an error if the database connection cannot be established.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates tables and indexes if absent, then applies additive column
    /// migrations. Old rows are never rewritten; columns added after the
    /// initial schema are nullable so historical rows read back as `None`.
    ///
    /// # Errors
    /// Returns an error if any DDL statement fails.
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS snapshots (
                id BIGSERIAL PRIMARY KEY,
                exchange TEXT NOT NULL,
                symbol TEXT NOT NULL,
                contract_type TEXT NOT NULL,
                quote_asset TEXT NOT NULL,
                timestamp TIMESTAMPTZ NOT NULL,
                price NUMERIC NOT NULL,
                volume_1h NUMERIC NOT NULL,
                funding_rate NUMERIC,
                mark_price NUMERIC,
                index_price NUMERIC,
                UNIQUE (exchange, symbol, timestamp)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        // Columns introduced after the first deployment; additive only.
        for stmt in [
            "ALTER TABLE snapshots ADD COLUMN IF NOT EXISTS volume_4h NUMERIC",
            "ALTER TABLE snapshots ADD COLUMN IF NOT EXISTS volume_24h NUMERIC",
            "ALTER TABLE snapshots ADD COLUMN IF NOT EXISTS open_interest NUMERIC",
        ] {
            sqlx::query(stmt).execute(&self.pool).await?;
        }

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_snapshots_symbol_ts
             ON snapshots (symbol, timestamp DESC)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS factor_records (
                symbol TEXT NOT NULL,
                timestamp TIMESTAMPTZ NOT NULL,
                momentum_1h DOUBLE PRECISION,
                momentum_4h DOUBLE PRECISION,
                momentum_24h DOUBLE PRECISION,
                momentum_percentile DOUBLE PRECISION,
                meanrev_zscore DOUBLE PRECISION,
                rsi_14 DOUBLE PRECISION,
                carry_funding_annualized DOUBLE PRECISION,
                carry_basis DOUBLE PRECISION,
                volume_momentum_1h DOUBLE PRECISION,
                volume_momentum_4h DOUBLE PRECISION,
                volume_momentum_24h DOUBLE PRECISION,
                volume_anomaly_zscore DOUBLE PRECISION,
                volume_percentile DOUBLE PRECISION,
                volume_price_divergence DOUBLE PRECISION,
                composite_score DOUBLE PRECISION,
                is_outlier BOOLEAN NOT NULL DEFAULT FALSE,
                outlier_type TEXT,
                computed_at TIMESTAMPTZ NOT NULL,
                source_snapshot_id BIGINT,
                PRIMARY KEY (symbol, timestamp)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_factor_records_ts
             ON factor_records (timestamp DESC)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS universe_entries (
                symbol TEXT NOT NULL,
                exchange TEXT NOT NULL,
                contract_type TEXT NOT NULL,
                quote_asset TEXT NOT NULL,
                quote_volume NUMERIC NOT NULL,
                funding_cadence_hours INT,
                as_of_date DATE NOT NULL,
                PRIMARY KEY (symbol, exchange, as_of_date)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS summaries (
                id BIGSERIAL PRIMARY KEY,
                timestamp TIMESTAMPTZ NOT NULL,
                content_hash TEXT NOT NULL,
                full_text TEXT NOT NULL,
                sent BOOLEAN NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        // Single-row table holding the last delivered fingerprint.
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS dedup_state (
                id INT PRIMARY KEY CHECK (id = 1),
                last_sent_hash TEXT
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "INSERT INTO dedup_state (id, last_sent_hash) VALUES (1, NULL)
             ON CONFLICT (id) DO NOTHING",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
