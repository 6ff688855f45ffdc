#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

use std::path::{Path, PathBuf};

use arklowdun_fixtures::SeedOptions;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

/// Four sources that sort as alpha (small), bravo (medium), charlie
/// (medium), delta (small).
pub fn write_corpus(dir: &Path) -> PathBuf {
    let corpus = dir.join("corpus");
    std::fs::create_dir_all(&corpus).unwrap();
    std::fs::write(corpus.join("alpha.txt"), b"alpha").unwrap();
    std::fs::write(corpus.join("bravo.bin"), vec![7u8; 150_000]).unwrap();
    std::fs::write(corpus.join("charlie.bin"), vec![9u8; 120_000]).unwrap();
    std::fs::write(corpus.join("delta.txt"), b"delta").unwrap();
    corpus
}

pub fn shipped_corpus() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/large/attachments")
}

/// The small scenario: seed 42, two households, 100 events, 50 notes and
/// 12 attachment rows.
pub fn small_options(out: &Path, corpus: &Path) -> SeedOptions {
    let mut options = SeedOptions::new(out, corpus);
    options.seed = 42;
    options.households = 2;
    options.events = 100;
    options.notes = 50;
    options.attachments = 12;
    options.skip_validation = true;
    options
}

/// Large enough that every quality gate clears with room to spare.
pub fn validated_options(out: &Path, corpus: &Path) -> SeedOptions {
    let mut options = SeedOptions::new(out, corpus);
    options.seed = 42;
    options.households = 2;
    options.events = 2000;
    options.notes = 1000;
    options.attachments = 60;
    options
}

pub async fn open_pool(db: &Path) -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(SqliteConnectOptions::new().filename(db))
        .await
        .expect("open seeded database")
}
