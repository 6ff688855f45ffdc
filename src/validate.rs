//! Quality gates applied to a finished corpus.
//!
//! Validation reads only the in-memory summary. Every failed gate is
//! collected so one run reports all of them.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::error::{AppError, VALIDATION_CODE};
use crate::summary::SeedSummary;

/// Minimum ratios a corpus must reach.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationThresholds {
    pub events_all_day: f64,
    pub events_recurring: f64,
    pub events_soft_deleted: f64,
    pub events_restored: f64,
    /// Share of recurring events that carry EXDATEs.
    pub recurring_with_exdates: f64,
    pub notes_soft_deleted: f64,
    pub notes_restored: f64,
    pub notes_with_deadline: f64,
}

impl Default for ValidationThresholds {
    fn default() -> Self {
        Self {
            events_all_day: 0.20,
            events_recurring: 0.10,
            events_soft_deleted: 0.05,
            events_restored: 0.02,
            recurring_with_exdates: 0.05,
            notes_soft_deleted: 0.05,
            notes_restored: 0.02,
            notes_with_deadline: 0.25,
        }
    }
}

/// Row counts the caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestedCounts {
    pub events: u64,
    pub notes: u64,
    pub attachments: u64,
}

#[derive(Debug, Error, Clone, PartialEq)]
#[error("corpus validation failed: {}", .violations.join("; "))]
pub struct ValidationError {
    pub violations: Vec<String>,
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        let mut app = AppError::new(VALIDATION_CODE, "generated corpus failed validation")
            .with_context("violations", err.violations.len().to_string());
        for (idx, violation) in err.violations.iter().enumerate() {
            app = app.with_context(format!("violation_{:02}", idx + 1), violation.clone());
        }
        app
    }
}

#[derive(Default)]
struct Checks {
    violations: Vec<String>,
}

impl Checks {
    fn exact(&mut self, label: &str, actual: u64, expected: u64) {
        if actual != expected {
            self.violations
                .push(format!("{label}: generated {actual}, requested {expected}"));
        }
    }

    fn ratio(&mut self, label: &str, count: u64, total: u64, minimum: f64) {
        let ratio = if total == 0 {
            0.0
        } else {
            count as f64 / total as f64
        };
        if ratio < minimum {
            self.violations.push(format!(
                "{label}: ratio {ratio:.4} ({count}/{total}) below minimum {minimum:.4}, short by {:.4}",
                minimum - ratio
            ));
        }
    }

    fn positive(&mut self, label: &str, count: u64) {
        if count == 0 {
            self.violations.push(format!("{label}: expected at least one, found 0"));
        }
    }
}

pub fn validate_summary(
    summary: &SeedSummary,
    requested: &RequestedCounts,
    thresholds: &ValidationThresholds,
) -> Result<(), ValidationError> {
    let mut checks = Checks::default();
    let events = &summary.events;
    let notes = &summary.notes;
    let attachments = &summary.attachments;

    checks.exact("events.total", events.total, requested.events);
    checks.exact("notes.total", notes.total, requested.notes);
    checks.exact("attachments.total", attachments.total, requested.attachments);

    checks.ratio("events.allDay", events.all_day, events.total, thresholds.events_all_day);
    checks.ratio("events.recurring", events.recurring, events.total, thresholds.events_recurring);
    checks.ratio("events.softDeleted", events.soft_deleted, events.total, thresholds.events_soft_deleted);
    checks.ratio("events.restored", events.restored, events.total, thresholds.events_restored);
    if events.recurring > 0 {
        checks.ratio(
            "events.recurringWithExdates",
            events.recurring_with_exdates,
            events.recurring,
            thresholds.recurring_with_exdates,
        );
    }

    checks.ratio("notes.softDeleted", notes.soft_deleted, notes.total, thresholds.notes_soft_deleted);
    checks.ratio("notes.restored", notes.restored, notes.total, thresholds.notes_restored);
    checks.ratio("notes.withDeadline", notes.with_deadline, notes.total, thresholds.notes_with_deadline);

    checks.positive("events.duplicateExdates", events.duplicate_exdates);
    checks.positive("events.dstEdge", events.dst_edge);
    checks.positive("events.withUntil", events.with_until);
    checks.positive("events.withCount", events.with_count);
    checks.positive("events.withByDay", events.with_byday);
    checks.positive("events.withByMonthDay", events.with_bymonthday);
    checks.positive("attachments.small", attachments.small);
    checks.positive("attachments.medium", attachments.medium);
    checks.positive("attachments.appDataRoot", attachments.app_data_root);
    checks.positive("attachments.reusedLogicalFiles", attachments.reused_logical_files);

    if checks.violations.is_empty() {
        Ok(())
    } else {
        for violation in &checks.violations {
            warn!(target: "arklowdun", event = "seed_validation_failed", violation = %violation);
        }
        Err(ValidationError {
            violations: checks.violations,
        })
    }
}
