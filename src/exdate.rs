//! EXDATE lists for recurring events.

use std::collections::HashSet;

use crate::error::AppResult;
use crate::prng::Mulberry32;
use crate::time::{format_iso, DAY_MS};

/// Probability that an EXDATE list after the first gets a repeated entry.
pub const DUPLICATE_CHANCE: f64 = 0.2;

/// Exception instants in draw order, repeats included, exactly as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExdateList {
    pub values: Vec<String>,
    /// At least one instant appears more than once.
    pub has_repeat: bool,
}

impl ExdateList {
    /// Comma-joined form written to the `exdates` column.
    pub fn joined(&self) -> String {
        self.values.join(",")
    }
}

/// Draw 1–3 exception instants after `start_ms`; the j-th lands 1 to
/// `6 + 2j` days out. With `force_duplicate` the first instant is appended
/// again, otherwise a repeat is added with [`DUPLICATE_CHANCE`].
pub fn synthesize_exdates(
    rng: &mut Mulberry32,
    start_ms: i64,
    force_duplicate: bool,
) -> AppResult<ExdateList> {
    let count = rng.int_range(1, 3);
    let mut values = Vec::with_capacity(count as usize + 1);
    for j in 0..count {
        let offset_days = rng.int_range(1, 6 + 2 * j);
        values.push(format_iso(start_ms + offset_days * DAY_MS)?);
    }
    if force_duplicate {
        let first = values[0].clone();
        values.push(first);
    } else if rng.chance(DUPLICATE_CHANCE) {
        let again = rng.choice(&values).clone();
        values.push(again);
    }

    // two independent offsets can also land on the same day
    let mut seen = HashSet::with_capacity(values.len());
    let has_repeat = !values.iter().all(|value| seen.insert(value.as_str()));
    Ok(ExdateList { values, has_repeat })
}
