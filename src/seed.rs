//! End-to-end seeding run: migrate, generate, check, summarise.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::attachments::{load_corpus, place_attachments, AttachmentRoots};
use crate::categories::generate_categories;
use crate::db::{
    begin_generator, finish_generator, foreign_key_violations, household_count, open_connection,
    set_foreign_keys,
};
use crate::error::{AppError, AppResult};
use crate::events::generate_events;
use crate::household::generate_households;
use crate::migrate::{apply_migrations, MigrationSource};
use crate::notes::generate_notes;
use crate::prng::Mulberry32;
use crate::summary::{SeedSummary, SupportingStats};
use crate::supporting::generate_supporting;
use crate::validate::{validate_summary, RequestedCounts, ValidationThresholds};

pub const DATABASE_FILE: &str = "arklowdun.sqlite3";
pub const DEFAULT_SEED: u32 = 42;
pub const DEFAULT_HOUSEHOLDS: u32 = 3;
pub const DEFAULT_EVENTS: u32 = 10_000;
pub const DEFAULT_NOTES: u32 = 5_000;
pub const DEFAULT_ATTACHMENTS: u32 = 300;
pub const MIN_HOUSEHOLDS: u32 = 2;

#[derive(Debug, Clone)]
pub struct SeedOptions {
    pub out_dir: PathBuf,
    pub attachments_dir: PathBuf,
    pub migrations: MigrationSource,
    pub seed: u32,
    pub households: u32,
    pub events: u32,
    pub notes: u32,
    pub attachments: u32,
    pub summary_path: Option<PathBuf>,
    pub reset: bool,
    pub skip_validation: bool,
    pub thresholds: ValidationThresholds,
}

impl SeedOptions {
    pub fn new(out_dir: impl Into<PathBuf>, attachments_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            attachments_dir: attachments_dir.into(),
            migrations: MigrationSource::Embedded,
            seed: DEFAULT_SEED,
            households: DEFAULT_HOUSEHOLDS,
            events: DEFAULT_EVENTS,
            notes: DEFAULT_NOTES,
            attachments: DEFAULT_ATTACHMENTS,
            summary_path: None,
            reset: false,
            skip_validation: false,
            thresholds: ValidationThresholds::default(),
        }
    }

    /// Range-check every count before anything touches disk.
    pub fn validate(&self) -> AppResult<()> {
        if self.households < MIN_HOUSEHOLDS {
            return Err(AppError::config("at least two households are required")
                .with_context("households", self.households.to_string()));
        }
        for (flag, value) in [
            ("events", self.events),
            ("notes", self.notes),
            ("attachments", self.attachments),
        ] {
            if value < 1 {
                return Err(AppError::config("count must be at least 1")
                    .with_context("flag", flag)
                    .with_context("value", value.to_string()));
            }
        }
        if self.out_dir.as_os_str().is_empty() {
            return Err(AppError::config("output directory must not be empty"));
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.out_dir.join(DATABASE_FILE)
    }

    pub fn roots(&self) -> AttachmentRoots {
        AttachmentRoots::under(&self.out_dir)
    }

    pub fn requested(&self) -> RequestedCounts {
        RequestedCounts {
            events: u64::from(self.events),
            notes: u64::from(self.notes),
            attachments: u64::from(self.attachments),
        }
    }
}

fn remove_if_present(path: &Path) -> AppResult<()> {
    let result = if path.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    match result {
        Ok(()) => {
            info!(target: "arklowdun", event = "seed_reset_removed", path = %path.display());
            Ok(())
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(AppError::from(err).with_context("path", path.display().to_string())),
    }
}

/// Remove the database (with its WAL and SHM companions) and both
/// attachment roots. Nothing else under the output directory is touched.
pub fn reset_outputs(options: &SeedOptions) -> AppResult<()> {
    let db = options.database_path();
    let mut targets = vec![db.clone()];
    for suffix in ["-wal", "-shm"] {
        let mut name = db.as_os_str().to_owned();
        name.push(suffix);
        targets.push(PathBuf::from(name));
    }
    let roots = options.roots();
    targets.push(roots.attachments);
    targets.push(roots.app_data);
    for target in &targets {
        remove_if_present(target)?;
    }
    Ok(())
}

pub async fn run(options: &SeedOptions) -> AppResult<SeedSummary> {
    options.validate()?;
    let corpus = load_corpus(&options.attachments_dir)?;
    options.migrations.load()?;

    info!(
        target: "arklowdun",
        event = "seed_start",
        out = %options.out_dir.display(),
        seed = options.seed,
        households = options.households,
        events = options.events,
        notes = options.notes,
        attachments = options.attachments,
        migrations = %options.migrations.describe()
    );

    if options.reset {
        reset_outputs(options)?;
    }

    let db_path = options.database_path();
    let mut conn = open_connection(&db_path).await?;
    let migrations_applied = apply_migrations(&mut conn, &options.migrations).await?;

    let existing = household_count(&mut conn).await?;
    if existing > 0 {
        return Err(AppError::config("target database already contains data; pass --reset")
            .with_context("path", db_path.display().to_string())
            .with_context("households", existing.to_string()));
    }

    set_foreign_keys(&mut conn, false).await?;
    let mut rng = Mulberry32::new(options.seed);
    let roots = options.roots();

    let mut tx = begin_generator(&mut conn, "households").await?;
    let result = generate_households(&mut tx, &mut rng, options.households as usize).await;
    let households = finish_generator(tx, "households", result).await?;

    let mut tx = begin_generator(&mut conn, "categories").await?;
    let result = generate_categories(&mut tx, &households).await;
    let categories = finish_generator(tx, "categories", result).await?;

    let mut tx = begin_generator(&mut conn, "events").await?;
    let result = generate_events(&mut tx, &mut rng, &households, options.events as usize).await;
    let events = finish_generator(tx, "events", result).await?;

    let mut tx = begin_generator(&mut conn, "notes").await?;
    let result = generate_notes(
        &mut tx,
        &mut rng,
        &households,
        &categories,
        options.notes as usize,
    )
    .await;
    let notes = finish_generator(tx, "notes", result).await?;

    let mut tx = begin_generator(&mut conn, "supporting").await?;
    let result = generate_supporting(&mut tx, &mut rng, &households).await;
    let supporting = finish_generator(tx, "supporting", result).await?;

    let mut tx = begin_generator(&mut conn, "attachments").await?;
    let result = place_attachments(
        &mut tx,
        &mut rng,
        &households,
        &supporting,
        &corpus,
        &roots,
        options.attachments as usize,
    )
    .await;
    let attachments = finish_generator(tx, "attachments", result).await?;

    set_foreign_keys(&mut conn, true).await?;
    let fk_violations = foreign_key_violations(&mut conn).await?;
    if fk_violations > 0 {
        warn!(target: "arklowdun", event = "seed_foreign_key_violations", count = fk_violations);
    }

    let summary = SeedSummary {
        database: DATABASE_FILE.to_string(),
        households: households.len() as u64,
        seed: options.seed,
        events,
        notes,
        attachments,
        supporting: SupportingStats {
            categories: categories.total() as u64,
            vehicles: supporting.vehicle_count() as u64,
            pets: supporting.pet_count() as u64,
        },
        migrations_applied,
        foreign_key_violations: fk_violations,
    };

    if options.skip_validation {
        warn!(target: "arklowdun", event = "seed_validation_skipped");
    } else {
        validate_summary(&summary, &options.requested(), &options.thresholds)?;
    }

    if let Some(path) = &options.summary_path {
        summary.write_atomic(path)?;
        info!(target: "arklowdun", event = "seed_summary_written", path = %path.display());
    }

    info!(
        target: "arklowdun",
        event = "seed_done",
        events = summary.events.total,
        notes = summary.notes.total,
        attachments = summary.attachments.total
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CONFIG_CODE;

    #[test]
    fn rejects_single_household() {
        let mut options = SeedOptions::new("/tmp/out", "/tmp/in");
        options.households = 1;
        let err = options.validate().unwrap_err();
        assert_eq!(err.code(), CONFIG_CODE);
        assert_eq!(err.context().get("households"), Some(&"1".to_string()));
    }

    #[test]
    fn rejects_zero_counts() {
        let mut options = SeedOptions::new("/tmp/out", "/tmp/in");
        options.notes = 0;
        let err = options.validate().unwrap_err();
        assert_eq!(err.context().get("flag"), Some(&"notes".to_string()));
    }

    #[test]
    fn defaults_are_valid() {
        let options = SeedOptions::new("/tmp/out", "/tmp/in");
        options.validate().unwrap();
        assert_eq!(options.seed, 42);
        assert_eq!(options.database_path(), Path::new("/tmp/out/arklowdun.sqlite3"));
    }

    #[test]
    fn reset_removes_only_generated_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let options = SeedOptions::new(dir.path(), dir.path().join("corpus"));
        std::fs::write(options.database_path(), b"db").unwrap();
        std::fs::write(dir.path().join("arklowdun.sqlite3-wal"), b"wal").unwrap();
        std::fs::create_dir_all(dir.path().join("appData/hh_01")).unwrap();
        std::fs::write(dir.path().join("keep.txt"), b"keep").unwrap();

        reset_outputs(&options).unwrap();

        assert!(!options.database_path().exists());
        assert!(!dir.path().join("arklowdun.sqlite3-wal").exists());
        assert!(!dir.path().join("appData").exists());
        assert!(dir.path().join("keep.txt").exists());
    }
}
