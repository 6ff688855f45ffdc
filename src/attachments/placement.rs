//! Deterministic placement of attachment-backed rows.
//!
//! Which source file a row points at, and which root it is copied into, are
//! pure functions of the row's logical key `household:table:position`. The
//! PRNG only decides row content, so changing the seed never moves a file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use sqlx::SqliteConnection;
use tracing::{debug, info};
use unicode_normalization::UnicodeNormalization;

use super::corpus::AttachmentSource;
use super::kind::{AttachmentTable, RootKey, SourceKind};
use crate::columns::{ColumnSpec, RowInserter, RowValues};
use crate::error::{AppError, AppResult};
use crate::household::Household;
use crate::prng::Mulberry32;
use crate::summary::AttachmentStats;
use crate::supporting::SupportingRecords;
use crate::time::{ANCHOR_MS, DAY_MS};

/// First digest byte below this picks the `attachments` root.
pub const ROOT_THRESHOLD: u8 = 196;
pub const SOFT_DELETE_CHANCE: f64 = 0.07;
pub const REMINDER_CHANCE: f64 = 0.5;

static UNSAFE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{N}._]+").expect("static regex"));

const SHARED_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::new("id"),
    ColumnSpec::new("household_id"),
    ColumnSpec::new("position"),
    ColumnSpec::new("root_key"),
    ColumnSpec::with_fallbacks("relative_path", &["document"]),
    ColumnSpec::new("document"),
    ColumnSpec::new("category"),
    ColumnSpec::new("created_at"),
    ColumnSpec::new("updated_at"),
    ColumnSpec::new("deleted_at"),
];

const PROPERTY_DESCRIPTIONS: [&str; 4] = [
    "Buildings insurance schedule",
    "Boiler service certificate",
    "Title deeds",
    "Energy performance certificate",
];
const INVENTORY_NAMES: [&str; 5] = ["Washing machine", "Laptop", "Sofa", "Television", "Bicycle"];
const MAINTENANCE_TYPES: [&str; 4] = ["MOT", "Service", "Tyres", "Brakes"];
const MEDICAL_DESCRIPTIONS: [&str; 4] = ["Vaccination", "Annual check-up", "Flea treatment", "Dental"];

fn table_columns(table: AttachmentTable) -> Vec<ColumnSpec> {
    let extra: &[ColumnSpec] = match table {
        AttachmentTable::Bills | AttachmentTable::Policies => &[
            ColumnSpec::new("amount"),
            ColumnSpec::new("due_date"),
            ColumnSpec::new("reminder"),
        ],
        AttachmentTable::PropertyDocuments => &[
            ColumnSpec::new("description"),
            ColumnSpec::new("renewal_date"),
            ColumnSpec::new("reminder"),
        ],
        AttachmentTable::InventoryItems => &[
            ColumnSpec::new("name"),
            ColumnSpec::new("purchase_date"),
            ColumnSpec::new("warranty_expiry"),
            ColumnSpec::new("reminder"),
        ],
        AttachmentTable::VehicleMaintenance => &[
            ColumnSpec::new("vehicle_id"),
            ColumnSpec::new("date"),
            ColumnSpec::new("type"),
            ColumnSpec::new("cost"),
        ],
        AttachmentTable::PetMedical => &[
            ColumnSpec::new("pet_id"),
            ColumnSpec::new("date"),
            ColumnSpec::new("description"),
            ColumnSpec::new("reminder"),
        ],
    };
    SHARED_COLUMNS.iter().chain(extra).copied().collect()
}

/// Directories backing the two root keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRoots {
    pub attachments: PathBuf,
    pub app_data: PathBuf,
}

impl AttachmentRoots {
    pub fn under(out_dir: &Path) -> Self {
        Self {
            attachments: out_dir.join(RootKey::Attachments.as_str()),
            app_data: out_dir.join(RootKey::AppData.as_str()),
        }
    }

    pub fn path_for(&self, root: RootKey) -> &Path {
        match root {
            RootKey::Attachments => &self.attachments,
            RootKey::AppData => &self.app_data,
        }
    }
}

pub fn logical_key(household_id: &str, table: AttachmentTable, position: i64) -> String {
    format!("{household_id}:{}:{position}", table.as_str())
}

/// Index into a corpus of `len` files: the first four digest bytes of `key`
/// read big-endian, modulo `len`.
pub fn select_source_index(key: &str, len: usize) -> usize {
    let digest = Sha256::digest(key.as_bytes());
    let head = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    (head as usize) % len
}

pub fn select_root(key: &str) -> RootKey {
    let digest = Sha256::digest(format!("root:{key}").as_bytes());
    if digest[0] < ROOT_THRESHOLD {
        RootKey::Attachments
    } else {
        RootKey::AppData
    }
}

/// NFC-normalise, collapse every run of characters other than letters,
/// digits, `.` and `_` into one `-`, lowercase and trim dashes.
pub fn sanitize_segment(raw: &str) -> String {
    let normalized: String = raw.nfc().collect();
    let collapsed = UNSAFE_RUN.replace_all(&normalized, "-").to_lowercase();
    let trimmed = collapsed.trim_matches('-');
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn relative_path(
    household_id: &str,
    table: AttachmentTable,
    position: i64,
    display_name: &str,
) -> String {
    format!(
        "{}/{}/{:04}-{}",
        sanitize_segment(household_id),
        table.as_str(),
        position,
        sanitize_segment(display_name)
    )
}

fn copy_into_root(
    roots: &AttachmentRoots,
    root: RootKey,
    relative: &str,
    source: &Path,
) -> AppResult<()> {
    let dest = relative
        .split('/')
        .fold(roots.path_for(root).to_path_buf(), |acc, seg| acc.join(seg));
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|err| AppError::from(err).with_context("path", parent.display().to_string()))?;
    }
    std::fs::copy(source, &dest).map_err(|err| {
        AppError::from(err)
            .with_context("operation", "attachment_copy")
            .with_context("from", source.display().to_string())
            .with_context("to", dest.display().to_string())
    })?;
    Ok(())
}

fn pick<'a>(rng: &mut Mulberry32, ids: &'a [String], what: &str) -> AppResult<&'a str> {
    if ids.is_empty() {
        return Err(AppError::config("attachment row needs a parent record")
            .with_context("parent", what.to_string()));
    }
    Ok(rng.choice(ids).as_str())
}

fn table_fields(
    rng: &mut Mulberry32,
    table: AttachmentTable,
    row: RowValues,
    created_at: i64,
    vehicles: &[String],
    pets: &[String],
) -> AppResult<RowValues> {
    let due = ANCHOR_MS + rng.int_range(-180, 365) * DAY_MS;
    let reminder = |rng: &mut Mulberry32| {
        rng.chance(REMINDER_CHANCE)
            .then(|| due - rng.int_range(1, 14) * DAY_MS)
    };
    let row = match table {
        AttachmentTable::Bills | AttachmentTable::Policies => row
            .set("amount", rng.int_range(1_500, 250_000))
            .set("due_date", due)
            .set("reminder", reminder(rng)),
        AttachmentTable::PropertyDocuments => row
            .set("description", *rng.choice(&PROPERTY_DESCRIPTIONS))
            .set("renewal_date", due)
            .set("reminder", reminder(rng)),
        AttachmentTable::InventoryItems => row
            .set("name", *rng.choice(&INVENTORY_NAMES))
            .set("purchase_date", created_at)
            .set("warranty_expiry", created_at + rng.int_range(365, 1095) * DAY_MS)
            .set("reminder", reminder(rng)),
        AttachmentTable::VehicleMaintenance => row
            .set("vehicle_id", pick(rng, vehicles, "vehicle")?)
            .set("date", due)
            .set("type", *rng.choice(&MAINTENANCE_TYPES))
            .set("cost", rng.int_range(2_000, 90_000)),
        AttachmentTable::PetMedical => row
            .set("pet_id", pick(rng, pets, "pet")?)
            .set("date", due)
            .set("description", *rng.choice(&MEDICAL_DESCRIPTIONS))
            .set("reminder", reminder(rng)),
    };
    Ok(row)
}

/// Spread `total` attachment rows over `households` (the last household
/// takes the remainder), cycling through the six tables per household.
pub async fn place_attachments(
    conn: &mut SqliteConnection,
    rng: &mut Mulberry32,
    households: &[Household],
    supporting: &SupportingRecords,
    corpus: &[AttachmentSource],
    roots: &AttachmentRoots,
    total: usize,
) -> AppResult<AttachmentStats> {
    if corpus.is_empty() {
        return Err(AppError::missing_input("attachment corpus is empty"));
    }
    if households.is_empty() {
        return Err(AppError::config("attachments need at least one household"));
    }

    let mut inserters = Vec::with_capacity(AttachmentTable::ALL.len());
    for table in AttachmentTable::iter() {
        inserters.push(RowInserter::prepare(conn, table.as_str(), &table_columns(table)).await?);
    }

    let mut stats = AttachmentStats::default();
    let mut usage = vec![0u64; corpus.len()];
    let per_household = total / households.len();
    let remainder = total % households.len();

    for (slot, household) in households.iter().enumerate() {
        let count = if slot + 1 == households.len() {
            per_household + remainder
        } else {
            per_household
        };
        let mut positions = [0i64; AttachmentTable::ALL.len()];

        for k in 0..count {
            let table = AttachmentTable::ALL[k % AttachmentTable::ALL.len()];
            let position = positions[table.index()];
            positions[table.index()] += 1;

            let key = logical_key(&household.id, table, position);
            let source_idx = select_source_index(&key, corpus.len());
            let source = &corpus[source_idx];
            let root = select_root(&key);
            let relative = relative_path(&household.id, table, position, &source.display_name);
            copy_into_root(roots, root, &relative, &source.abs_path)?;

            let id = rng.uuid_like();
            let created_at = ANCHOR_MS - rng.int_range(0, 540) * DAY_MS;
            let updated_at = created_at + rng.int_range(0, 30) * DAY_MS;
            let deleted_at = rng
                .chance(SOFT_DELETE_CHANCE)
                .then(|| updated_at + rng.int_range(1, 10) * DAY_MS);

            let row = RowValues::new()
                .set("id", id.as_str())
                .set("household_id", household.id.as_str())
                .set("position", position)
                .set("root_key", root.as_str())
                .set("relative_path", relative.as_str())
                .set("document", relative.as_str())
                .set("category", table.as_str())
                .set("created_at", created_at)
                .set("updated_at", updated_at)
                .set("deleted_at", deleted_at);
            let row = table_fields(
                rng,
                table,
                row,
                created_at,
                supporting.vehicles_for(slot),
                supporting.pets_for(slot),
            )?;
            inserters[table.index()].insert(conn, &row).await?;

            debug!(
                target: "arklowdun",
                event = "attachment_placed",
                key = %key,
                source = %source.display_name,
                root = %root,
                relative_path = %relative
            );

            usage[source_idx] += 1;
            stats.total += 1;
            match source.kind {
                SourceKind::Small => stats.small += 1,
                SourceKind::Medium => stats.medium += 1,
            }
            match root {
                RootKey::Attachments => stats.attachments_root += 1,
                RootKey::AppData => stats.app_data_root += 1,
            }
            if deleted_at.is_some() {
                stats.soft_deleted += 1;
            }
            *stats.by_table.entry(table.as_str().to_string()).or_insert(0) += 1;
        }
    }

    let mut source_files = BTreeMap::new();
    for (source, uses) in corpus.iter().zip(&usage) {
        if *uses > 0 {
            *source_files.entry(source.display_name.clone()).or_insert(0) += *uses;
        }
    }
    stats.source_files = source_files;
    stats.reused_logical_files = usage.iter().filter(|uses| **uses > 1).count() as u64;
    stats.max_source_reuse = usage.iter().copied().max().unwrap_or(0);

    info!(
        target: "arklowdun",
        event = "seed_attachments",
        total = stats.total,
        small = stats.small,
        medium = stats.medium,
        attachments_root = stats.attachments_root,
        app_data_root = stats.app_data_root,
        reused = stats.reused_logical_files
    );
    Ok(stats)
}
