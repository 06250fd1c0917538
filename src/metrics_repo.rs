// SQLite sample store: four append-only record sets, one per metric kind.
// Rows are written by the sampling worker and never mutated; queries are
// range scans by timestamp plus group-by-host averages.

use std::path::Path;
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::instrument;

use crate::error::MetricsError;
use crate::models::SampleOutcome;

pub struct MetricsRepo {
    pool: SqlitePool,
}

impl MetricsRepo {
    pub async fn connect(path: &str, max_pool_size: u32) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_pool_size)
            .connect_with(opts)
            .await?;
        Ok(Self { pool })
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cpu_usage (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                host TEXT NOT NULL,
                timestamp INTEGER NOT NULL DEFAULT (CAST(strftime('%s', 'now') AS INTEGER) * 1000),
                cpu_usage REAL NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS memory_usage (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                host TEXT NOT NULL,
                timestamp INTEGER NOT NULL DEFAULT (CAST(strftime('%s', 'now') AS INTEGER) * 1000),
                memory_usage REAL NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS disk_usage (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                host TEXT NOT NULL,
                timestamp INTEGER NOT NULL DEFAULT (CAST(strftime('%s', 'now') AS INTEGER) * 1000),
                read REAL NOT NULL,
                write REAL NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS network_usage (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                host TEXT NOT NULL,
                timestamp INTEGER NOT NULL DEFAULT (CAST(strftime('%s', 'now') AS INTEGER) * 1000),
                received REAL NOT NULL,
                sent REAL NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        for table in ["cpu_usage", "memory_usage", "disk_usage", "network_usage"] {
            sqlx::query(&format!(
                "CREATE INDEX IF NOT EXISTS idx_{table}_timestamp ON {table}(timestamp)"
            ))
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }

    /// Append one row per kind that produced a value, all stamped with the
    /// same instant, in one transaction: an abandoned cycle rolls back whole,
    /// never leaving a half-written sample. Returns the number of rows.
    #[instrument(skip(self, sample), fields(repo = "metrics", operation = "insert_sample"))]
    pub async fn insert_sample(
        &self,
        host: &str,
        timestamp_ms: i64,
        sample: &SampleOutcome,
    ) -> Result<u32, MetricsError> {
        if sample.is_empty() {
            return Ok(0);
        }
        let mut tx = self.pool.begin().await?;
        let mut rows = 0u32;

        if let Some(cpu) = sample.cpu_percent {
            sqlx::query("INSERT INTO cpu_usage (host, timestamp, cpu_usage) VALUES ($1, $2, $3)")
                .bind(host)
                .bind(timestamp_ms)
                .bind(cpu)
                .execute(&mut *tx)
                .await?;
            rows += 1;
        }
        if let Some(memory) = sample.memory_percent {
            sqlx::query(
                "INSERT INTO memory_usage (host, timestamp, memory_usage) VALUES ($1, $2, $3)",
            )
            .bind(host)
            .bind(timestamp_ms)
            .bind(memory)
            .execute(&mut *tx)
            .await?;
            rows += 1;
        }
        if let Some(disk) = sample.disk {
            sqlx::query(
                "INSERT INTO disk_usage (host, timestamp, read, write) VALUES ($1, $2, $3, $4)",
            )
            .bind(host)
            .bind(timestamp_ms)
            .bind(disk.read)
            .bind(disk.write)
            .execute(&mut *tx)
            .await?;
            rows += 1;
        }
        if let Some(network) = sample.network {
            sqlx::query(
                "INSERT INTO network_usage (host, timestamp, received, sent) VALUES ($1, $2, $3, $4)",
            )
            .bind(host)
            .bind(timestamp_ms)
            .bind(network.received)
            .bind(network.sent)
            .execute(&mut *tx)
            .await?;
            rows += 1;
        }

        tx.commit().await?;
        Ok(rows)
    }

    /// Every host that appears in any record set.
    pub async fn known_hosts(&self) -> Result<Vec<String>, MetricsError> {
        let hosts = sqlx::query_scalar::<_, String>(
            "SELECT host FROM cpu_usage
             UNION SELECT host FROM memory_usage
             UNION SELECT host FROM disk_usage
             UNION SELECT host FROM network_usage
             ORDER BY host",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(hosts)
    }

    /// Per-host mean CPU utilization for samples at or after `cutoff_ms`;
    /// `None` scans all history. Hosts with no qualifying samples are absent.
    #[instrument(skip(self), fields(repo = "metrics", operation = "cpu_averages"))]
    pub async fn cpu_averages(
        &self,
        cutoff_ms: Option<i64>,
    ) -> Result<Vec<(String, f64)>, MetricsError> {
        let rows = sqlx::query_as::<_, (String, f64)>(
            "SELECT host, AVG(cpu_usage) FROM cpu_usage
             WHERE $1 IS NULL OR timestamp >= $1 GROUP BY host",
        )
        .bind(cutoff_ms)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    #[instrument(skip(self), fields(repo = "metrics", operation = "memory_averages"))]
    pub async fn memory_averages(
        &self,
        cutoff_ms: Option<i64>,
    ) -> Result<Vec<(String, f64)>, MetricsError> {
        let rows = sqlx::query_as::<_, (String, f64)>(
            "SELECT host, AVG(memory_usage) FROM memory_usage
             WHERE $1 IS NULL OR timestamp >= $1 GROUP BY host",
        )
        .bind(cutoff_ms)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Per-host mean (read, write) disk rates.
    #[instrument(skip(self), fields(repo = "metrics", operation = "disk_averages"))]
    pub async fn disk_averages(
        &self,
        cutoff_ms: Option<i64>,
    ) -> Result<Vec<(String, f64, f64)>, MetricsError> {
        let rows = sqlx::query_as::<_, (String, f64, f64)>(
            "SELECT host, AVG(read), AVG(write) FROM disk_usage
             WHERE $1 IS NULL OR timestamp >= $1 GROUP BY host",
        )
        .bind(cutoff_ms)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Per-host mean (received, sent) network rates.
    #[instrument(skip(self), fields(repo = "metrics", operation = "network_averages"))]
    pub async fn network_averages(
        &self,
        cutoff_ms: Option<i64>,
    ) -> Result<Vec<(String, f64, f64)>, MetricsError> {
        let rows = sqlx::query_as::<_, (String, f64, f64)>(
            "SELECT host, AVG(received), AVG(sent) FROM network_usage
             WHERE $1 IS NULL OR timestamp >= $1 GROUP BY host",
        )
        .bind(cutoff_ms)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
