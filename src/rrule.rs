//! Recurrence rules in the subset of RFC 5545 the calendar understands.

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::time::rrule_stamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    pub const ALL: [Frequency; 3] = [Frequency::Daily, Frequency::Weekly, Frequency::Monthly];

    pub const fn as_str(self) -> &'static str {
        match self {
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Monthly => "MONTHLY",
        }
    }

    /// Largest INTERVAL drawn for this frequency.
    pub const fn max_interval(self) -> i64 {
        match self {
            Frequency::Monthly => 2,
            _ => 4,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Until(DateTime<Utc>),
    Count(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    ByDay(&'static str),
    ByMonthDay(u32),
}

/// Weekday selections used for daily and weekly rules.
pub const BYDAY_POOL: [&str; 11] = [
    "MO",
    "TU",
    "WE",
    "TH",
    "FR",
    "SA",
    "SU",
    "MO,WE,FR",
    "TU,TH",
    "SA,SU",
    "MO,TU,WE,TH,FR",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub freq: Frequency,
    pub interval: u32,
    pub bound: Bound,
    pub selector: Selector,
}

impl RecurrenceRule {
    pub fn has_until(&self) -> bool {
        matches!(self.bound, Bound::Until(_))
    }

    pub fn has_byday(&self) -> bool {
        matches!(self.selector, Selector::ByDay(_))
    }
}

/// Parts are always emitted as FREQ, INTERVAL, UNTIL|COUNT, BYDAY|BYMONTHDAY.
impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FREQ={};INTERVAL={}", self.freq, self.interval)?;
        match self.bound {
            Bound::Until(until) => write!(f, ";UNTIL={}", rrule_stamp(&until))?,
            Bound::Count(count) => write!(f, ";COUNT={count}")?,
        }
        match &self.selector {
            Selector::ByDay(days) => write!(f, ";BYDAY={days}"),
            Selector::ByMonthDay(day) => write!(f, ";BYMONTHDAY={day}"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuleShapeError {
    #[error("rrule part `{0}` is not KEY=VALUE")]
    MalformedPart(String),
    #[error("rrule key {key} appears {count} times")]
    Repeated { key: &'static str, count: usize },
    #[error("rrule needs exactly one of {0}")]
    ExactlyOneOf(&'static str),
    #[error("MONTHLY rules select by BYMONTHDAY, others by BYDAY")]
    SelectorMismatch,
}

/// Check the shape every generated rule must have: one FREQ, one INTERVAL,
/// exactly one of UNTIL/COUNT, and BYMONTHDAY iff FREQ=MONTHLY (BYDAY
/// otherwise).
pub fn check_well_formed(rrule: &str) -> Result<(), RuleShapeError> {
    let mut counts = [0usize; 6];
    let keys = ["FREQ", "INTERVAL", "UNTIL", "COUNT", "BYDAY", "BYMONTHDAY"];
    let mut freq = None;

    for part in rrule.split(';') {
        let (key, value) = part
            .split_once('=')
            .ok_or_else(|| RuleShapeError::MalformedPart(part.to_string()))?;
        if let Some(idx) = keys.iter().position(|k| *k == key) {
            counts[idx] += 1;
        }
        if key == "FREQ" {
            freq = Some(value.to_string());
        }
    }

    for (idx, key) in keys.iter().enumerate().take(2) {
        if counts[idx] != 1 {
            return Err(RuleShapeError::Repeated {
                key: *key,
                count: counts[idx],
            });
        }
    }
    if counts[2] + counts[3] != 1 {
        return Err(RuleShapeError::ExactlyOneOf("UNTIL, COUNT"));
    }
    if counts[4] + counts[5] != 1 {
        return Err(RuleShapeError::ExactlyOneOf("BYDAY, BYMONTHDAY"));
    }
    let monthly = freq.as_deref() == Some("MONTHLY");
    if monthly != (counts[5] == 1) {
        return Err(RuleShapeError::SelectorMismatch);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn renders_parts_in_fixed_order() {
        let rule = RecurrenceRule {
            freq: Frequency::Daily,
            interval: 1,
            bound: Bound::Until(Utc.with_ymd_and_hms(2024, 4, 20, 6, 0, 0).unwrap()),
            selector: Selector::ByDay("MO,WE,FR"),
        };
        assert_eq!(
            rule.to_string(),
            "FREQ=DAILY;INTERVAL=1;UNTIL=20240420T060000Z;BYDAY=MO,WE,FR"
        );
        assert!(check_well_formed(&rule.to_string()).is_ok());
    }

    #[test]
    fn monthly_uses_bymonthday() {
        let rule = RecurrenceRule {
            freq: Frequency::Monthly,
            interval: 2,
            bound: Bound::Count(12),
            selector: Selector::ByMonthDay(28),
        };
        assert_eq!(
            rule.to_string(),
            "FREQ=MONTHLY;INTERVAL=2;COUNT=12;BYMONTHDAY=28"
        );
        assert!(check_well_formed(&rule.to_string()).is_ok());
    }

    #[test]
    fn rejects_bad_shapes() {
        assert_eq!(
            check_well_formed("FREQ=DAILY;INTERVAL=1;COUNT=3;UNTIL=20240101T000000Z;BYDAY=MO"),
            Err(RuleShapeError::ExactlyOneOf("UNTIL, COUNT"))
        );
        assert_eq!(
            check_well_formed("FREQ=MONTHLY;INTERVAL=1;COUNT=3;BYDAY=MO"),
            Err(RuleShapeError::SelectorMismatch)
        );
        assert_eq!(
            check_well_formed("FREQ=WEEKLY;COUNT=3;BYDAY=MO"),
            Err(RuleShapeError::Repeated {
                key: "INTERVAL",
                count: 0
            })
        );
        assert!(matches!(
            check_well_formed("FREQ=WEEKLY;INTERVAL"),
            Err(RuleShapeError::MalformedPart(_))
        ));
    }

    #[test]
    fn interval_ceiling_depends_on_frequency() {
        assert_eq!(Frequency::Monthly.max_interval(), 2);
        assert_eq!(Frequency::Weekly.max_interval(), 4);
    }
}
