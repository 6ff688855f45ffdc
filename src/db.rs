use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteSynchronous};
use sqlx::{ConnectOptions, Connection, Sqlite, SqliteConnection, Transaction};
use tracing::{error, info, warn};

use crate::error::{AppError, AppResult};

/// Open the single connection used for a seeding run, creating the file and
/// its parent directory when missing.
///
/// Everything runs on one connection so connection-scoped pragmas such as
/// `foreign_keys` hold for the whole run.
pub async fn open_connection(db_path: &Path) -> AppResult<SqliteConnection> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            error!(
                target: "arklowdun",
                error = %e,
                event = "db_dir_create_failed",
                path = %parent.display()
            );
            AppError::from(e).with_context("path", parent.display().to_string())
        })?;
    }
    info!(target: "arklowdun", event = "db_path", path = %db_path.display());

    let mut conn = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Full)
        .foreign_keys(true)
        .log_statements(log::LevelFilter::Off)
        .connect()
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000;")
        .execute(&mut conn)
        .await?;

    log_effective_pragmas(&mut conn).await;
    Ok(conn)
}

async fn log_effective_pragmas(conn: &mut SqliteConnection) {
    let (sqlite_ver,): (String,) = sqlx::query_as("select sqlite_version()")
        .fetch_one(&mut *conn)
        .await
        .unwrap_or((String::from("unknown"),));

    let jm: (String,) = sqlx::query_as("PRAGMA journal_mode;")
        .fetch_one(&mut *conn)
        .await
        .unwrap_or((String::from("unknown"),));

    let fks: (i64,) = sqlx::query_as("PRAGMA foreign_keys;")
        .fetch_one(&mut *conn)
        .await
        .unwrap_or((i64::MIN,));

    info!(
        target: "arklowdun",
        event = "db_open",
        sqlite_version = %sqlite_ver,
        journal_mode = %jm.0,
        foreign_keys = %fks.0
    );

    if !jm.0.eq_ignore_ascii_case("wal") {
        warn!(
            target: "arklowdun",
            event = "db_open_warning",
            msg = "journal_mode != WAL; running with reduced crash safety"
        );
    }
}

/// Toggle foreign-key enforcement. Has no effect inside an open transaction.
pub async fn set_foreign_keys(conn: &mut SqliteConnection, enabled: bool) -> AppResult<()> {
    let sql = if enabled {
        "PRAGMA foreign_keys=ON;"
    } else {
        "PRAGMA foreign_keys=OFF;"
    };
    sqlx::query(sql).execute(&mut *conn).await?;
    info!(target: "arklowdun", event = "db_foreign_keys", enabled);
    Ok(())
}

/// Number of rows reported by `PRAGMA foreign_key_check`.
pub async fn foreign_key_violations(conn: &mut SqliteConnection) -> AppResult<i64> {
    let rows = sqlx::query("PRAGMA foreign_key_check;")
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows.len() as i64)
}

pub async fn household_count(conn: &mut SqliteConnection) -> AppResult<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM household")
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

/// Open the transaction that scopes one generator's inserts.
pub async fn begin_generator<'c>(
    conn: &'c mut SqliteConnection,
    generator: &str,
) -> AppResult<Transaction<'c, Sqlite>> {
    let tx = conn.begin().await?;
    info!(target: "arklowdun", event = "db_tx_begin", generator);
    Ok(tx)
}

/// Commit on success, roll back on error. The generator's own error is
/// returned unchanged when the rollback itself succeeds.
pub async fn finish_generator<T>(
    tx: Transaction<'_, Sqlite>,
    generator: &str,
    result: AppResult<T>,
) -> AppResult<T> {
    match result {
        Ok(val) => {
            tx.commit().await?;
            info!(target: "arklowdun", event = "db_tx_commit", generator);
            Ok(val)
        }
        Err(e) => {
            if let Err(rb) = tx.rollback().await {
                error!(target: "arklowdun", event = "db_tx_rollback_failed", generator, error = %rb);
            } else {
                warn!(target: "arklowdun", event = "db_tx_rollback", generator, error = %e);
            }
            Err(e)
        }
    }
}
