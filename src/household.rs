use sqlx::SqliteConnection;
use tracing::info;

use crate::columns::{ColumnSpec, RowInserter, RowValues};
use crate::error::AppResult;
use crate::prng::Mulberry32;
use crate::time::{parse_tz, ANCHOR_MS, DAY_MS};

/// Timezones assigned to households in rotation.
pub const TIMEZONE_POOL: [&str; 6] = [
    "Europe/London",
    "America/New_York",
    "Europe/Dublin",
    "America/Los_Angeles",
    "Asia/Tokyo",
    "Australia/Sydney",
];

const NAMES: [&str; 8] = [
    "Harbour View",
    "Oak Cottage",
    "Riverside Flat",
    "Hillcrest",
    "Willow Lane",
    "Kestrel House",
    "Seaview Terrace",
    "Elm Court",
];

const COLORS: [&str; 5] = ["#2563EB", "#16A34A", "#DC2626", "#9333EA", "#EA580C"];

const COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::new("id"),
    ColumnSpec::new("name"),
    ColumnSpec::with_fallbacks("tz", &["timezone"]),
    ColumnSpec::new("is_default"),
    ColumnSpec::new("color"),
    ColumnSpec::new("created_at"),
    ColumnSpec::new("updated_at"),
    ColumnSpec::new("deleted_at"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Household {
    pub id: String,
    pub name: String,
    pub tz: String,
}

pub fn household_id(index: usize) -> String {
    format!("hh_{:02}", index + 1)
}

/// Seed `count` households. The first one is the default household.
pub async fn generate_households(
    conn: &mut SqliteConnection,
    rng: &mut Mulberry32,
    count: usize,
) -> AppResult<Vec<Household>> {
    for tz in TIMEZONE_POOL {
        parse_tz(tz)?;
    }
    let inserter = RowInserter::prepare(conn, "household", COLUMNS).await?;

    let mut households = Vec::with_capacity(count);
    for index in 0..count {
        let household = Household {
            id: household_id(index),
            name: format!("{} {}", NAMES[index % NAMES.len()], index + 1),
            tz: TIMEZONE_POOL[index % TIMEZONE_POOL.len()].to_string(),
        };
        let created_at = ANCHOR_MS - rng.int_range(400, 800) * DAY_MS;
        let row = RowValues::new()
            .set("id", household.id.as_str())
            .set("name", household.name.as_str())
            .set("tz", household.tz.as_str())
            .set("is_default", index == 0)
            .set("color", *rng.choice(&COLORS))
            .set("created_at", created_at)
            .set("updated_at", created_at)
            .set("deleted_at", Option::<i64>::None);
        inserter.insert(conn, &row).await?;
        households.push(household);
    }

    info!(target: "arklowdun", event = "seed_households", count = households.len());
    Ok(households)
}
