//! Calendar event generator.
//!
//! Events cycle through four shapes by index, with an occasional random
//! override. Recurring events carry an RRULE and sometimes an EXDATE list.
//! The first recurring event is pinned to the spring-forward transition in
//! New York so every corpus contains a DST boundary fixture. After insertion a
//! bounded prefix of the soft-deleted events is restored.

use sqlx::SqliteConnection;
use tracing::{debug, info};

use crate::columns::{ColumnSpec, RowInserter, RowValues};
use crate::error::{AppError, AppResult};
use crate::exdate::{synthesize_exdates, ExdateList};
use crate::household::Household;
use crate::lifecycle::{restore, restore_target, RestoreCandidate};
use crate::prng::Mulberry32;
use crate::rrule::{Bound, Frequency, RecurrenceRule, Selector, BYDAY_POOL};
use crate::summary::EventStats;
use crate::time::{
    add_months, crosses_offset_change, to_datetime, ANCHOR_MS, DAY_MS, DST_FIXTURE_START_MS,
    DST_FIXTURE_TZ, HOUR_MS, MINUTE_MS, WEEK_MS,
};

pub const SHAPE_OVERRIDE_CHANCE: f64 = 0.1;
pub const REMINDER_CHANCE: f64 = 0.45;
pub const SOFT_DELETE_CHANCE: f64 = 0.10;
pub const RESTORE_FRACTION: f64 = 0.03;
pub const EXDATE_CHANCE: f64 = 0.4;
/// Percentage of the expected recurring events that may carry EXDATEs.
pub const EXDATE_SHARE_PERCENT: usize = 35;

const TITLES: [&str; 12] = [
    "Dentist",
    "School run",
    "Team standup",
    "Bin collection",
    "Football practice",
    "Grocery delivery",
    "Piano lesson",
    "Car service",
    "Vet check-up",
    "Book club",
    "Date night",
    "Council tax due",
];

const COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::new("id"),
    ColumnSpec::new("title"),
    ColumnSpec::new("tz"),
    ColumnSpec::with_fallbacks("start_at_utc", &["start_at", "starts_at"]),
    ColumnSpec::with_fallbacks("end_at_utc", &["end_at", "ends_at"]),
    ColumnSpec::new("rrule"),
    ColumnSpec::new("exdates"),
    ColumnSpec::new("reminder"),
    ColumnSpec::new("household_id"),
    ColumnSpec::new("created_at"),
    ColumnSpec::new("updated_at"),
    ColumnSpec::new("deleted_at"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventShape {
    Timed,
    AllDay,
    Recurring,
    MultiDay,
}

impl EventShape {
    pub const CYCLE: [EventShape; 4] = [
        EventShape::Timed,
        EventShape::AllDay,
        EventShape::Recurring,
        EventShape::MultiDay,
    ];
}

/// Upper bound on events that receive EXDATEs, derived from the number of
/// recurring events the shape cycle is expected to produce.
pub fn exdate_cap(total: usize) -> u64 {
    let expected_recurring = total.div_ceil(EventShape::CYCLE.len());
    ((expected_recurring * EXDATE_SHARE_PERCENT).div_ceil(100) as u64).max(1)
}

/// Running state of the recurring sub-generator.
#[derive(Debug, Default)]
struct RecurrenceState {
    recurring: u64,
    with_exdates: u64,
    exdate_cap: u64,
}

struct RecurringPlan {
    start: i64,
    tz: String,
    rule: RecurrenceRule,
    exdates: Option<ExdateList>,
}

fn plan_recurring(
    rng: &mut Mulberry32,
    state: &mut RecurrenceState,
    index: usize,
    start: i64,
    tz: &str,
) -> AppResult<RecurringPlan> {
    let recurring_index = state.recurring;
    state.recurring += 1;

    let (start, tz, freq, interval) = if recurring_index == 0 {
        (DST_FIXTURE_START_MS, DST_FIXTURE_TZ.to_string(), Frequency::Daily, 1)
    } else {
        let freq = Frequency::ALL[(index + recurring_index as usize) % Frequency::ALL.len()];
        let interval = rng.int_range(1, freq.max_interval());
        (start, tz.to_string(), freq, interval)
    };

    let bound = if (index + 3) % 5 == 0 {
        let until_ms = match freq {
            Frequency::Daily => start + rng.int_range(25, 90) * DAY_MS,
            Frequency::Weekly => start + rng.int_range(8, 26) * WEEK_MS,
            Frequency::Monthly => add_months(start, rng.int_range(6, 18) as u32)?,
        };
        Bound::Until(to_datetime(until_ms)?)
    } else {
        Bound::Count(rng.int_range(10, 40) as u32)
    };

    let selector = match freq {
        Frequency::Monthly => Selector::ByMonthDay(rng.int_range(1, 28) as u32),
        _ => Selector::ByDay(*rng.choice(&BYDAY_POOL)),
    };

    let wants_exdates = recurring_index % 3 == 0 || rng.chance(EXDATE_CHANCE);
    let exdates = if wants_exdates && state.with_exdates < state.exdate_cap {
        let force_duplicate = state.with_exdates == 0;
        state.with_exdates += 1;
        Some(synthesize_exdates(rng, start, force_duplicate)?)
    } else {
        None
    };

    Ok(RecurringPlan {
        start,
        tz,
        rule: RecurrenceRule {
            freq,
            interval: interval as u32,
            bound,
            selector,
        },
        exdates,
    })
}

/// Generate `total` events spread round-robin over `households`.
pub async fn generate_events(
    conn: &mut SqliteConnection,
    rng: &mut Mulberry32,
    households: &[Household],
    total: usize,
) -> AppResult<EventStats> {
    if households.is_empty() {
        return Err(AppError::config("events need at least one household"));
    }
    let inserter = RowInserter::prepare(conn, "events", COLUMNS).await?;
    let mut stats = EventStats::default();
    let mut recurrence = RecurrenceState {
        exdate_cap: exdate_cap(total),
        ..RecurrenceState::default()
    };
    let mut candidates: Vec<RestoreCandidate> = Vec::new();
    let half = (total / 2) as i64;

    for index in 0..total {
        let household = &households[index % households.len()];
        let id = rng.uuid_like();

        let mut shape = EventShape::CYCLE[index % EventShape::CYCLE.len()];
        if rng.chance(SHAPE_OVERRIDE_CHANCE) {
            shape = *rng.choice(&EventShape::CYCLE);
        }

        let day_start = ANCHOR_MS + (index as i64 - half) * DAY_MS;
        let mut start = if shape == EventShape::AllDay {
            day_start
        } else {
            day_start + rng.int_range(0, 23) * HOUR_MS + *rng.choice(&[0, 15, 30, 45]) * MINUTE_MS
        };
        let mut tz = household.tz.clone();
        let mut rrule = None;
        let mut exdates = None;

        let end = match shape {
            EventShape::Timed => {
                stats.timed += 1;
                start + rng.int_range(1, 4) * HOUR_MS
            }
            EventShape::AllDay => {
                stats.all_day += 1;
                start + DAY_MS
            }
            EventShape::MultiDay => {
                stats.multi_day += 1;
                start + rng.int_range(2, 5) * DAY_MS
            }
            EventShape::Recurring => {
                let plan = plan_recurring(rng, &mut recurrence, index, start, &household.tz)?;
                start = plan.start;
                tz = plan.tz;
                stats.recurring += 1;
                if plan.rule.has_until() {
                    stats.with_until += 1;
                } else {
                    stats.with_count += 1;
                }
                if plan.rule.has_byday() {
                    stats.with_byday += 1;
                } else {
                    stats.with_bymonthday += 1;
                }
                if let Some(list) = plan.exdates {
                    stats.recurring_with_exdates += 1;
                    if list.has_repeat {
                        stats.duplicate_exdates += 1;
                    }
                    exdates = Some(list.joined());
                }
                rrule = Some(plan.rule.to_string());
                start + rng.int_range(1, 3) * HOUR_MS
            }
        };

        if crosses_offset_change(&tz, start, DAY_MS)? {
            stats.dst_edge += 1;
        }

        let created_at = start - rng.int_range(1, 14) * DAY_MS;
        let updated_at = (created_at + rng.int_range(1, 5) * DAY_MS + rng.int_range(0, 12) * HOUR_MS)
            .max(created_at);
        let reminder = if rng.chance(REMINDER_CHANCE) {
            stats.with_reminder += 1;
            Some(start - rng.int_range(15, 240) * MINUTE_MS)
        } else {
            None
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

        let title = format!("{} #{}", rng.choice(&TITLES), index + 1);
        let row = RowValues::new()
            .set("id", id.as_str())
            .set("title", title)
            .set("tz", tz.as_str())
            .set("start_at_utc", start)
            .set("end_at_utc", end)
            .set("rrule", rrule)
            .set("exdates", exdates)
            .set("reminder", reminder)
            .set("household_id", household.id.as_str())
            .set("created_at", created_at)
            .set("updated_at", updated_at)
            .set("deleted_at", deleted_at);
        inserter.insert(conn, &row).await?;
        stats.total += 1;

        if (index + 1) % 1000 == 0 {
            debug!(target: "arklowdun", event = "seed_events_progress", inserted = index + 1, total);
        }
    }

    let target = restore_target(total, RESTORE_FRACTION, candidates.len());
    let restored = restore(conn, &inserter, &candidates, target).await?;
    stats.restored = restored as u64;
    stats.soft_deleted = (candidates.len() - restored) as u64;

    info!(
        target: "arklowdun",
        event = "seed_events",
        total = stats.total,
        recurring = stats.recurring,
        with_exdates = stats.recurring_with_exdates,
        dst_edge = stats.dst_edge,
        soft_deleted = stats.soft_deleted,
        restored = stats.restored
    );
    Ok(stats)
}
