use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;

use jardin_core::config::DatabaseConfig;

pub type DbPool = sqlx::SqlitePool;

/// Open a pool from the `[database]` section of the app config.
pub async fn connect(database: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    connect_with_settings(&database.url, database.max_connections, database.timeout_secs).await
}

pub async fn connect_with_settings(
    database_url: &str,
    max_connections: u32,
    timeout_secs: u64,
) -> Result<DbPool, sqlx::Error> {
    let timeout_secs = timeout_secs.max(1);
    // A blocked writer waits as long as the pool does before giving up, so
    // both limits come from the same configured timeout.
    let busy_timeout_ms = timeout_secs.saturating_mul(1000).min(i32::MAX as u64);
    SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(Duration::from_secs(timeout_secs))
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                for pragma in [
                    "PRAGMA foreign_keys = ON".to_string(),
                    "PRAGMA journal_mode = WAL".to_string(),
                    format!("PRAGMA busy_timeout = {busy_timeout_ms}"),
                ] {
                    sqlx::query(&pragma).execute(&mut *conn).await?;
                }
                Ok(())
            })
        })
        .connect(database_url)
        .await
}

#[cfg(test)]
mod tests {
    use jardin_core::config::DatabaseConfig;
    use sqlx::Row;

    use super::connect;

    #[tokio::test]
    async fn pool_applies_config_and_session_pragmas() {
        let database = DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            timeout_secs: 7,
        };
        let pool = connect(&database).await.expect("connect");

        let foreign_keys: i64 = sqlx::query("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .expect("pragma foreign_keys")
            .try_get(0)
            .expect("value");
        assert_eq!(foreign_keys, 1);

        let busy_timeout: i64 = sqlx::query("PRAGMA busy_timeout")
            .fetch_one(&pool)
            .await
            .expect("pragma busy_timeout")
            .try_get(0)
            .expect("value");
        assert_eq!(busy_timeout, 7000);
    }
}
