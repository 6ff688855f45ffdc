//! Soft-delete and restore pass shared by the event and note generators.

use sqlx::SqliteConnection;
use tracing::info;

use crate::columns::{quote_ident, RowInserter};
use crate::error::{AppError, AppResult};

/// A soft-deleted row and the instant it will be restored at, should it be
/// picked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreCandidate {
    pub id: String,
    pub restore_at: i64,
}

/// How many soft-deleted rows to bring back: `floor(total * fraction)`
/// clamped to `[1, available]`, or zero when nothing was deleted.
pub fn restore_target(total: usize, fraction: f64, available: usize) -> usize {
    if available == 0 {
        return 0;
    }
    let wanted = (total as f64 * fraction).floor() as usize;
    wanted.clamp(1, available)
}

/// Restore the first `target` candidates in insertion order by clearing
/// `deleted_at` and moving `updated_at` to their restore instant.
pub async fn restore(
    conn: &mut SqliteConnection,
    inserter: &RowInserter,
    candidates: &[RestoreCandidate],
    target: usize,
) -> AppResult<usize> {
    let table = inserter.table();
    let column = |logical: &str| {
        inserter.physical_for(logical).ok_or_else(|| {
            AppError::schema_mismatch(table, "restore needs a resolvable column")
                .with_context("column", logical.to_string())
        })
    };
    let sql = format!(
        "UPDATE {} SET {} = NULL, {} = ? WHERE {} = ?",
        quote_ident(table),
        quote_ident(column("deleted_at")?),
        quote_ident(column("updated_at")?),
        quote_ident(column("id")?),
    );

    let chosen = &candidates[..target.min(candidates.len())];
    for candidate in chosen {
        sqlx::query(&sql)
            .bind(candidate.restore_at)
            .bind(&candidate.id)
            .execute(&mut *conn)
            .await
            .map_err(|err| {
                AppError::from(err)
                    .with_context("operation", "restore")
                    .with_context("table", table.to_string())
            })?;
    }
    info!(
        target: "arklowdun",
        event = "seed_restored",
        table,
        soft_deleted = candidates.len(),
        restored = chosen.len()
    );
    Ok(chosen.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_is_clamped_to_available() {
        assert_eq!(restore_target(1000, 0.03, 100), 30);
        assert_eq!(restore_target(1000, 0.03, 12), 12);
    }

    #[test]
    fn tiny_totals_still_restore_one() {
        assert_eq!(restore_target(10, 0.03, 2), 1);
    }

    #[test]
    fn nothing_deleted_means_nothing_restored() {
        assert_eq!(restore_target(5000, 0.04, 0), 0);
    }
}
