use std::time::Duration;

use sqlx::{PgPool, postgres::PgPoolOptions};
use tokio::sync::OnceCell;

/// Database
///
/// Process-wide, lazily opened connection pool. The first caller of [`Database::pool`]
/// connects and runs the embedded migrations; concurrent first callers wait on
/// the same attempt and later callers reuse the pool. A failed attempt leaves the
/// cell empty so the next request retries.
pub struct Database {
    url: String,
    max_connections: u32,
    acquire_timeout: Duration,
    pool: OnceCell<PgPool>,
}

impl Database {
    pub fn new(url: &str, max_connections: u32, acquire_timeout: Duration) -> Self {
        Self {
            url: url.to_string(),
            max_connections,
            acquire_timeout,
            pool: OnceCell::new(),
        }
    }

    /// Connect-or-reuse.
    pub async fn pool(&self) -> Result<&PgPool, sqlx::Error> {
        self.pool
            .get_or_try_init(|| async {
                let pool = PgPoolOptions::new()
                    .max_connections(self.max_connections)
                    .acquire_timeout(self.acquire_timeout)
                    .connect(&self.url)
                    .await
                    .inspect_err(|e| tracing::error!(error = %e, "database connection failed"))?;

                sqlx::migrate!("./migrations").run(&pool).await?;
                tracing::info!("database connected and migrated");
                Ok::<_, sqlx::Error>(pool)
            })
            .await
    }

    pub fn is_connected(&self) -> bool {
        self.pool.get().is_some_and(|pool| !pool.is_closed())
    }

    /// Closes the pool if it was ever opened. Safe to call more than once.
    pub async fn close(&self) {
        if let Some(pool) = self.pool.get() {
            pool.close().await;
            tracing::info!("database pool closed");
        }
    }
}
