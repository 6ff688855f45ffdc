use std::path::{Path, PathBuf};

use tracing::info;
use unicode_normalization::UnicodeNormalization;
use walkdir::WalkDir;

use super::kind::SourceKind;
use crate::error::{AppError, AppResult};

/// One sample file the placement engine can copy from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentSource {
    pub disk_name: String,
    /// NFC form of `disk_name`.
    pub display_name: String,
    pub abs_path: PathBuf,
    pub size: u64,
    pub kind: SourceKind,
}

/// List the regular files directly inside `dir`, skipping dotfiles, sorted
/// by NFC display name then raw disk name.
pub fn load_corpus(dir: &Path) -> AppResult<Vec<AttachmentSource>> {
    if !dir.is_dir() {
        return Err(AppError::missing_input("attachment corpus directory not found")
            .with_context("path", dir.display().to_string()));
    }

    let mut sources = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|err| {
            AppError::missing_input("attachment corpus directory is unreadable")
                .with_context("path", dir.display().to_string())
                .with_context("error", err.to_string())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let disk_name = entry.file_name().to_string_lossy().into_owned();
        if disk_name.starts_with('.') {
            continue;
        }
        let size = entry
            .metadata()
            .map_err(|err| {
                AppError::new("IO/METADATA", "failed to stat attachment source")
                    .with_context("path", entry.path().display().to_string())
                    .with_context("error", err.to_string())
            })?
            .len();
        let abs_path = std::fs::canonicalize(entry.path())?;
        sources.push(AttachmentSource {
            display_name: disk_name.nfc().collect(),
            disk_name,
            abs_path,
            size,
            kind: SourceKind::classify(size),
        });
    }

    if sources.is_empty() {
        return Err(AppError::missing_input("attachment corpus directory is empty")
            .with_context("path", dir.display().to_string()));
    }

    sources.sort_by(|a, b| {
        a.display_name
            .cmp(&b.display_name)
            .then_with(|| a.disk_name.cmp(&b.disk_name))
    });

    info!(
        target: "arklowdun",
        event = "attachment_corpus_loaded",
        path = %dir.display(),
        files = sources.len(),
        small = sources.iter().filter(|s| s.kind == SourceKind::Small).count()
    );
    Ok(sources)
}
