use rand::Rng;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    Pool, Sqlite,
};
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{info, instrument, warn};

use crate::TARGET_STORE;

#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

/// Marks sqlx errors caused by SQLite's own lock contention, distinct from
/// any other database error — only these are worth a local retry loop.
pub trait DbLockErrorExt {
    fn is_database_lock_error(&self) -> bool;
}

impl DbLockErrorExt for sqlx::Error {
    fn is_database_lock_error(&self) -> bool {
        match self {
            sqlx::Error::Database(err) => {
                let msg = err.message();
                msg.contains("database is locked") || msg.contains("database table is locked")
            }
            _ => false,
        }
    }
}

/// Runs `op` with exponential backoff and jitter on `SQLITE_BUSY`/`SQLITE_LOCKED`.
/// Any other error is returned immediately — the Store never retries on
/// behalf of callers for non-lock failures.
pub(crate) async fn with_lock_retry<T, F, Fut>(mut op: F) -> Result<T, sqlx::Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    let max_retries = 5;
    let mut backoff_ms = 50u64;

    for attempt in 0..max_retries {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if e.is_database_lock_error() && attempt < max_retries - 1 => {
                let jitter: u64 = rand::rng().random_range(0..=backoff_ms / 2);
                warn!(target: TARGET_STORE, "database locked, retrying in {}ms", backoff_ms + jitter);
                tokio::time::sleep(Duration::from_millis(backoff_ms + jitter)).await;
                backoff_ms *= 2;
            }
            Err(e) => return Err(e),
        }
    }
    unreachable!()
}

impl Database {
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    #[instrument(target = "db", level = "info", skip(database_path))]
    pub async fn new(database_path: &str) -> Result<Self, sqlx::Error> {
        info!(target: TARGET_STORE, "opening database at {}", database_path);

        let connect_options = SqliteConnectOptions::from_str(&format!("sqlite://{database_path}"))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;

        let db = Database { pool };
        db.initialize_schema().await?;
        info!(target: TARGET_STORE, "database ready");

        Ok(db)
    }

    pub async fn instance(database_path: &str) -> &'static Database {
        static INSTANCE: OnceCell<Database> = OnceCell::const_new();
        INSTANCE
            .get_or_init(|| async {
                Database::new(database_path)
                    .await
                    .expect("failed to initialize database")
            })
            .await
    }
}
