use sqlx::SqliteConnection;
use tracing::info;

use crate::categories::CategoryCatalog;
use crate::columns::{ColumnSpec, RowInserter, RowValues};
use crate::error::{AppError, AppResult};
use crate::household::Household;
use crate::lifecycle::{restore, restore_target, RestoreCandidate};
use crate::prng::Mulberry32;
use crate::summary::NoteStats;
use crate::time::{ANCHOR_MS, DAY_MS, HOUR_MS};

pub const CATEGORY_CHANCE: f64 = 0.35;
pub const DEADLINE_CHANCE: f64 = 0.35;
pub const SOFT_DELETE_CHANCE: f64 = 0.12;
pub const RESTORE_FRACTION: f64 = 0.04;

const COLORS: [&str; 6] = [
    "#FFF4B8", "#FFD6E0", "#C7F2FF", "#D9F99D", "#E9D5FF", "#FDE68A",
];

const TEXTS: [&str; 10] = [
    "Call the plumber about the boiler",
    "Renew passport before summer",
    "Pick up dry cleaning",
    "Book the car in for its MOT",
    "Order birthday present",
    "Check home insurance excess",
    "Buy more dog food",
    "Pay the window cleaner",
    "Return library books",
    "Defrost the freezer",
];

const COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::new("id"),
    ColumnSpec::new("household_id"),
    ColumnSpec::new("category_id"),
    ColumnSpec::with_fallbacks("text", &["body"]),
    ColumnSpec::new("color"),
    ColumnSpec::new("x"),
    ColumnSpec::new("y"),
    ColumnSpec::new("z"),
    ColumnSpec::new("position"),
    ColumnSpec::new("created_at"),
    ColumnSpec::new("updated_at"),
    ColumnSpec::new("deleted_at"),
    ColumnSpec::new("deadline"),
    ColumnSpec::new("deadline_tz"),
];

/// Per-household counters threaded through the generator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoteCursor {
    /// Next position; also used as the note's z-order.
    pub position: i64,
    /// Round-robin index into the household's categories.
    pub category: usize,
}

impl NoteCursor {
    fn advance(&mut self) -> i64 {
        let position = self.position;
        self.position += 1;
        position
    }

    /// Pick the next category id when the note should be categorised.
    fn next_category<'a>(
        &mut self,
        rng: &mut Mulberry32,
        position: i64,
        categories: &'a [String],
    ) -> Option<&'a String> {
        if categories.is_empty() {
            return None;
        }
        if position % 2 == 0 || rng.chance(CATEGORY_CHANCE) {
            let id = &categories[self.category % categories.len()];
            self.category += 1;
            Some(id)
        } else {
            None
        }
    }
}

pub async fn generate_notes(
    conn: &mut SqliteConnection,
    rng: &mut Mulberry32,
    households: &[Household],
    categories: &CategoryCatalog,
    total: usize,
) -> AppResult<NoteStats> {
    if households.is_empty() {
        return Err(AppError::config("notes need at least one household"));
    }
    let inserter = RowInserter::prepare(conn, "notes", COLUMNS).await?;
    let mut cursors = vec![NoteCursor::default(); households.len()];
    let mut stats = NoteStats::default();
    let mut candidates = Vec::new();

    for index in 0..total {
        let slot = index % households.len();
        let household = &households[slot];
        let cursor = &mut cursors[slot];
        let id = rng.uuid_like();

        let position = cursor.advance();
        let category_id = cursor.next_category(rng, position, categories.for_household(slot));
        if category_id.is_some() {
            stats.categorized += 1;
        }

        let created_at = ANCHOR_MS - rng.int_range(0, 365) * DAY_MS + rng.int_range(0, 23) * HOUR_MS;
        let updated_at = created_at + rng.int_range(0, 10) * DAY_MS;
        let (deadline, deadline_tz) = if rng.chance(DEADLINE_CHANCE) {
            stats.with_deadline += 1;
            (
                Some(created_at + rng.int_range(1, 60) * DAY_MS),
                Some(household.tz.as_str()),
            )
        } else {
            (None, None)
        };
        let deleted_at = if rng.chance(SOFT_DELETE_CHANCE) {
            let deleted_at = updated_at + rng.int_range(1, 5) * DAY_MS;
            candidates.push(RestoreCandidate {
                id: id.clone(),
                restore_at: deleted_at + rng.int_range(1, 5) * DAY_MS,
            });
            Some(deleted_at)
        } else {
            None
        };

        let row = RowValues::new()
            .set("id", id.as_str())
            .set("household_id", household.id.as_str())
            .set("category_id", category_id.map(String::as_str))
            .set("text", *rng.choice(&TEXTS))
            .set("color", *rng.choice(&COLORS))
            .set("x", rng.int_range(0, 1200) as f64)
            .set("y", rng.int_range(0, 800) as f64)
            .set("z", position)
            .set("position", position)
            .set("created_at", created_at)
            .set("updated_at", updated_at)
            .set("deleted_at", deleted_at)
            .set("deadline", deadline)
            .set("deadline_tz", deadline_tz);
        inserter.insert(conn, &row).await?;
        stats.total += 1;
    }

    let target = restore_target(total, RESTORE_FRACTION, candidates.len());
    let restored = restore(conn, &inserter, &candidates, target).await?;
    stats.restored = restored as u64;
    stats.soft_deleted = (candidates.len() - restored) as u64;

    info!(
        target: "arklowdun",
        event = "seed_notes",
        total = stats.total,
        categorized = stats.categorized,
        with_deadline = stats.with_deadline,
        soft_deleted = stats.soft_deleted,
        restored = stats.restored
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cats() -> Vec<String> {
        vec!["a".into(), "b".into(), "c".into()]
    }

    #[test]
    fn even_positions_are_always_categorised() {
        let mut rng = Mulberry32::new(1);
        let mut cursor = NoteCursor::default();
        let categories = cats();
        for _ in 0..20 {
            let position = cursor.advance();
            let picked = cursor.next_category(&mut rng, position, &categories);
            if position % 2 == 0 {
                assert!(picked.is_some());
            }
        }
        assert_eq!(cursor.position, 20);
        assert!(cursor.category >= 10);
    }

    #[test]
    fn categories_round_robin() {
        let mut rng = Mulberry32::new(1);
        let mut cursor = NoteCursor::default();
        let categories = cats();
        let picked: Vec<&String> = [0, 2, 4, 6]
            .iter()
            .filter_map(|p| cursor.next_category(&mut rng, *p, &categories))
            .collect();
        assert_eq!(picked, vec!["a", "b", "c", "a"]);
    }

    #[test]
    fn no_categories_means_uncategorised() {
        let mut rng = Mulberry32::new(1);
        let mut cursor = NoteCursor::default();
        assert!(cursor.next_category(&mut rng, 0, &[]).is_none());
    }
}
