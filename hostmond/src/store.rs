//! Durable metrics log
//!
//! Every sampled snapshot is appended as one row to a SQLite table. Rows are
//! never updated or deleted; the in-memory history is lossy across restarts
//! and this table is the durable record.

use crate::types::{Metrics, parse_timestamp};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use tracing::{debug, info};

/// Metrics storage backed by SQLite
pub struct MetricsStore {
    pool: SqlitePool,
}

impl MetricsStore {
    /// Open (or create) the database and ensure the schema exists
    pub async fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, sqlx::Error> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        // Path goes in verbatim; a URL would treat `?` and `%` as syntax.
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS metrics (
                timestamp TEXT,
                cpu_usage REAL,
                memory_usage REAL,
                disk_read REAL,
                disk_write REAL,
                network_sent REAL,
                network_received REAL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        info!("Metrics store initialized at {}", db_path.display());
        Ok(Self { pool })
    }

    /// Append one snapshot
    pub async fn save(&self, metrics: &Metrics) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO metrics VALUES (?, ?, ?, ?, ?, ?, ?)")
            .bind(metrics.timestamp_string())
            .bind(metrics.cpu_usage)
            .bind(metrics.memory_usage)
            .bind(metrics.disk_read)
            .bind(metrics.disk_write)
            .bind(metrics.network_sent)
            .bind(metrics.network_received)
            .execute(&self.pool)
            .await?;

        debug!("Saved metrics for {}", metrics.timestamp_string());
        Ok(())
    }

    /// Number of rows persisted so far
    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        let row = sqlx::query("SELECT COUNT(*) FROM metrics")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get(0))
    }

    /// Newest `limit` rows, returned oldest first
    pub async fn recent(&self, limit: i64) -> Result<Vec<Metrics>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT timestamp, cpu_usage, memory_usage, disk_read, disk_write,
                   network_sent, network_received
            FROM metrics
            ORDER BY rowid DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for r in rows.into_iter().rev() {
            let raw: String = r.get(0);
            let timestamp =
                parse_timestamp(&raw).map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
            out.push(Metrics {
                timestamp,
                cpu_usage: r.get(1),
                memory_usage: r.get(2),
                disk_read: r.get(3),
                disk_write: r.get(4),
                network_sent: r.get(5),
                network_received: r.get(6),
            });
        }
        Ok(out)
    }

    /// Close the pool; later saves fail with `PoolClosed`
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
