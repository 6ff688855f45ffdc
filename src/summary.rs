//! Counters gathered while seeding, reported as the JSON summary.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventStats {
    pub total: u64,
    pub timed: u64,
    pub all_day: u64,
    pub recurring: u64,
    pub multi_day: u64,
    pub with_until: u64,
    pub with_count: u64,
    #[serde(rename = "withByDay")]
    pub with_byday: u64,
    #[serde(rename = "withByMonthDay")]
    pub with_bymonthday: u64,
    pub recurring_with_exdates: u64,
    pub duplicate_exdates: u64,
    pub dst_edge: u64,
    pub with_reminder: u64,
    /// Still soft-deleted after the restore pass.
    pub soft_deleted: u64,
    pub restored: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteStats {
    pub total: u64,
    pub categorized: u64,
    pub with_deadline: u64,
    pub soft_deleted: u64,
    pub restored: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentStats {
    pub total: u64,
    pub small: u64,
    pub medium: u64,
    pub attachments_root: u64,
    pub app_data_root: u64,
    pub soft_deleted: u64,
    /// Source files placed more than once.
    pub reused_logical_files: u64,
    pub max_source_reuse: u64,
    pub by_table: BTreeMap<String, u64>,
    pub source_files: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportingStats {
    pub categories: u64,
    pub vehicles: u64,
    pub pets: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedSummary {
    /// Database file name, relative to the output directory.
    pub database: String,
    pub households: u64,
    pub seed: u32,
    pub events: EventStats,
    pub notes: NoteStats,
    pub attachments: AttachmentStats,
    pub supporting: SupportingStats,
    pub migrations_applied: Vec<String>,
    pub foreign_key_violations: i64,
}

impl SeedSummary {
    pub fn to_pretty_json(&self) -> AppResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the summary next to `path` and rename it into place.
    pub fn write_atomic(&self, path: &Path) -> AppResult<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        std::io::Write::write_all(&mut tmp, self.to_pretty_json()?.as_bytes())?;
        std::io::Write::write_all(&mut tmp, b"\n")?;
        tmp.persist(path).map_err(|err| {
            AppError::from(err.error).with_context("path", path.display().to_string())
        })?;
        Ok(())
    }
}
