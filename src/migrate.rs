use std::collections::HashMap;
use std::path::{Path, PathBuf};

use include_dir::{include_dir, Dir};
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use sqlx::{Connection, Row, SqliteConnection};
use tracing::{error, info};

use crate::error::{AppError, AppResult};
use crate::time::now_ms;

static EMBEDDED: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/migrations");

static ADD_COLUMN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^ALTER\s+TABLE\s+(\w+)\s+ADD\s+COLUMN\s+(\w+)").expect("static regex")
});

/// Where migration files come from.
#[derive(Debug, Clone, Default)]
pub enum MigrationSource {
    /// The `migrations/` directory compiled into the binary.
    #[default]
    Embedded,
    /// A directory of `*.sql` files read at runtime.
    Directory(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    pub filename: String,
    pub sql: String,
}

impl Migration {
    fn cleaned(&self) -> String {
        self.sql
            .lines()
            .filter(|line| {
                let t = line.trim_start();
                !(t.is_empty() || t.starts_with("--"))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn checksum(&self) -> String {
        format!("{:x}", Sha256::digest(self.cleaned().as_bytes()))
    }
}

fn preview(sql: &str) -> String {
    let one_line = sql.replace(['\n', '\t'], " ");
    let trimmed = one_line.trim();
    if trimmed.chars().count() > 160 {
        let head: String = trimmed.chars().take(160).collect();
        format!("{head}…")
    } else {
        trimmed.to_string()
    }
}

impl MigrationSource {
    /// Ordered migrations. A directory source must exist and contain at
    /// least one `.sql` file.
    pub fn load(&self) -> AppResult<Vec<Migration>> {
        let mut migrations = match self {
            MigrationSource::Embedded => EMBEDDED
                .files()
                .filter_map(|file| {
                    let name = file.path().file_name()?.to_str()?.to_string();
                    if !name.ends_with(".sql") {
                        return None;
                    }
                    Some(Migration {
                        filename: name,
                        sql: file.contents_utf8()?.to_string(),
                    })
                })
                .collect::<Vec<_>>(),
            MigrationSource::Directory(dir) => read_directory(dir)?,
        };
        migrations.sort_by(|a, b| a.filename.cmp(&b.filename));
        if migrations.is_empty() {
            return Err(AppError::missing_input("no migration files found")
                .with_context("source", self.describe()));
        }
        Ok(migrations)
    }

    pub fn describe(&self) -> String {
        match self {
            MigrationSource::Embedded => "embedded".to_string(),
            MigrationSource::Directory(dir) => dir.display().to_string(),
        }
    }
}

fn read_directory(dir: &Path) -> AppResult<Vec<Migration>> {
    let entries = std::fs::read_dir(dir).map_err(|err| {
        AppError::missing_input("migrations directory is unreadable")
            .with_context("path", dir.display().to_string())
            .with_cause(err)
    })?;
    let mut migrations = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.ends_with(".sql") || !path.is_file() {
            continue;
        }
        migrations.push(Migration {
            filename: name.to_string(),
            sql: std::fs::read_to_string(&path)?,
        });
    }
    Ok(migrations)
}

async fn column_exists(conn: &mut SqliteConnection, table: &str, column: &str) -> AppResult<bool> {
    let exists: Option<i64> =
        sqlx::query_scalar("SELECT 1 FROM pragma_table_info(?1) WHERE name = ?2")
            .bind(table)
            .bind(column)
            .fetch_optional(&mut *conn)
            .await?;
    Ok(exists.is_some())
}

/// Apply every migration from `source` not yet recorded in
/// `schema_migrations`. Returns the filenames applied by this call.
pub async fn apply_migrations(
    conn: &mut SqliteConnection,
    source: &MigrationSource,
) -> AppResult<Vec<String>> {
    let migrations = source.load()?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS schema_migrations (\
           version   TEXT PRIMARY KEY,\
           applied_at INTEGER NOT NULL,\
           checksum TEXT NOT NULL\
         )",
    )
    .execute(&mut *conn)
    .await?;

    let rows = sqlx::query("SELECT version, checksum FROM schema_migrations")
        .fetch_all(&mut *conn)
        .await?;
    let mut applied: HashMap<String, String> = HashMap::new();
    for r in rows {
        if let (Ok(v), Ok(c)) = (
            r.try_get::<String, _>("version"),
            r.try_get::<String, _>("checksum"),
        ) {
            applied.insert(v, c);
        }
    }

    let mut newly_applied = Vec::new();
    for migration in &migrations {
        let filename = migration.filename.as_str();
        let checksum = migration.checksum();

        if let Some(stored) = applied.get(filename) {
            if stored != &checksum {
                return Err(AppError::new(
                    "MIGRATION/CHECKSUM_MISMATCH",
                    "migration edited after application",
                )
                .with_context("file", filename.to_string()));
            }
            info!(target: "arklowdun", event = "migration_skip_file", file = %filename);
            continue;
        }

        let mut tx = conn.begin().await?;
        for stmt in migration.cleaned().split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            let upper = s.to_ascii_uppercase();
            if upper == "BEGIN" || upper == "COMMIT" {
                continue;
            }
            if let Some(caps) = ADD_COLUMN_RE.captures(s) {
                let table = &caps[1];
                let col = &caps[2];
                if column_exists(&mut tx, table, col).await? {
                    info!(target: "arklowdun", event = "migration_stmt_skip", file = %filename, sql = %preview(s));
                    continue;
                }
            }
            info!(target: "arklowdun", event = "migration_stmt", file = %filename, sql = %preview(s));
            if let Err(e) = sqlx::query(s).execute(&mut *tx).await {
                error!(target: "arklowdun", event = "migration_stmt_error", file = %filename, sql = %preview(s), error = %e);
                return Err(AppError::from(e).with_context("file", filename.to_string()));
            }
        }

        sqlx::query(
            "INSERT INTO schema_migrations (version, applied_at, checksum) VALUES (?, ?, ?)",
        )
        .bind(filename)
        .bind(now_ms())
        .bind(&checksum)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(target: "arklowdun", event = "migration_file_applied", file = %filename);
        newly_applied.push(filename.to_string());
    }

    Ok(newly_applied)
}
