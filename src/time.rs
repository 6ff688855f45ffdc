use chrono::{DateTime, Months, Offset, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{AppError, AppResult, TIME_RANGE_CODE};

pub const MINUTE_MS: i64 = 60_000;
pub const HOUR_MS: i64 = 60 * MINUTE_MS;
pub const DAY_MS: i64 = 24 * HOUR_MS;
pub const WEEK_MS: i64 = 7 * DAY_MS;

/// 2024-01-01T00:00:00Z. Generated timelines are spread around this instant.
pub const ANCHOR_MS: i64 = 1_704_067_200_000;

/// 2024-03-10T06:00:00Z: 01:00 EST in New York, one hour before clocks
/// spring forward.
pub const DST_FIXTURE_START_MS: i64 = 1_710_050_400_000;
pub const DST_FIXTURE_TZ: &str = "America/New_York";

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn to_datetime(ms: i64) -> AppResult<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms).ok_or_else(|| {
        AppError::new(TIME_RANGE_CODE, "timestamp outside supported range")
            .with_context("ms", ms.to_string())
    })
}

/// `2024-03-12T06:00:00Z`, the canonical EXDATE instant format.
pub fn format_iso(ms: i64) -> AppResult<String> {
    Ok(to_datetime(ms)?.format("%Y-%m-%dT%H:%M:%SZ").to_string())
}

/// `20240312T060000Z`, the RRULE UNTIL format.
pub fn rrule_stamp(at: &DateTime<Utc>) -> String {
    at.format("%Y%m%dT%H%M%SZ").to_string()
}

pub fn add_months(ms: i64, months: u32) -> AppResult<i64> {
    to_datetime(ms)?
        .checked_add_months(Months::new(months))
        .map(|dt| dt.timestamp_millis())
        .ok_or_else(|| {
            AppError::new(TIME_RANGE_CODE, "month arithmetic overflowed")
                .with_context("ms", ms.to_string())
                .with_context("months", months.to_string())
        })
}

pub fn parse_tz(name: &str) -> AppResult<Tz> {
    name.parse::<Tz>().map_err(|_| {
        AppError::new("TIME/INVALID_TIMEZONE", "unknown IANA timezone")
            .with_context("timezone", name.to_string())
    })
}

/// UTC offset in seconds of `tz` at instant `ms`.
pub fn offset_seconds(tz: &Tz, ms: i64) -> AppResult<i32> {
    let dt = to_datetime(ms)?;
    Ok(tz
        .offset_from_utc_datetime(&dt.naive_utc())
        .fix()
        .local_minus_utc())
}

/// True when the wall-clock offset of `tz` changes between `start_ms` and
/// `start_ms + window_ms`.
pub fn crosses_offset_change(tz_name: &str, start_ms: i64, window_ms: i64) -> AppResult<bool> {
    let tz = parse_tz(tz_name)?;
    Ok(offset_seconds(&tz, start_ms)? != offset_seconds(&tz, start_ms + window_ms)?)
}
