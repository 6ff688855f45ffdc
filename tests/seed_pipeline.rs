#![allow(clippy::unwrap_used, clippy::expect_used)]

mod util;

use arklowdun_fixtures::error::{CONFIG_CODE, MISSING_INPUT_CODE, VALIDATION_CODE};
use arklowdun_fixtures::rrule::check_well_formed;
use arklowdun_fixtures::time::{DST_FIXTURE_START_MS, DST_FIXTURE_TZ};
use arklowdun_fixtures::{run, SeedSummary};
use rrule::RRuleSet;
use sqlx::Row;
use tempfile::tempdir;

use util::{open_pool, small_options, validated_options, write_corpus};

#[tokio::test]
async fn small_scenario_produces_expected_shape() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let corpus = write_corpus(dir.path());
    let out = dir.path().join("out");
    let options = small_options(&out, &corpus);

    let summary = run(&options).await?;
    assert_eq!(summary.events.total, 100);
    assert_eq!(summary.notes.total, 50);
    assert_eq!(summary.attachments.total, 12);
    assert_eq!(summary.households, 2);
    assert_eq!(summary.foreign_key_violations, 0);
    assert!(summary.attachments.reused_logical_files > 0);
    assert!(summary.events.dst_edge >= 1);
    assert!(summary.events.duplicate_exdates >= 1);

    let pool = open_pool(&options.database_path()).await;

    let rules: Vec<(String, i64)> =
        sqlx::query_as("SELECT rrule, start_at_utc FROM events WHERE rrule IS NOT NULL")
            .fetch_all(&pool)
            .await?;
    assert_eq!(rules.len() as u64, summary.events.recurring);
    for (rule, start) in &rules {
        check_well_formed(rule).unwrap_or_else(|e| panic!("{rule}: {e}"));
        let stamp = chrono::DateTime::from_timestamp_millis(*start)
            .unwrap()
            .format("%Y%m%dT%H%M%SZ");
        let set: RRuleSet = format!("DTSTART:{stamp}\nRRULE:{rule}")
            .parse()
            .unwrap_or_else(|e| panic!("{rule}: {e}"));
        assert!(!set.all(3).dates.is_empty(), "{rule} yields no occurrences");
    }

    let dst: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM events WHERE tz = ?1 AND start_at_utc = ?2 \
         AND rrule LIKE 'FREQ=DAILY;INTERVAL=1;%'",
    )
    .bind(DST_FIXTURE_TZ)
    .bind(DST_FIXTURE_START_MS)
    .fetch_one(&pool)
    .await?;
    assert_eq!(dst, 1);

    let inverted: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM events WHERE end_at_utc < start_at_utc")
            .fetch_one(&pool)
            .await?;
    assert_eq!(inverted, 0);

    let with_exdates: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM events WHERE exdates IS NOT NULL")
            .fetch_one(&pool)
            .await?;
    assert_eq!(with_exdates as u64, summary.events.recurring_with_exdates);

    let deleted: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM events WHERE deleted_at IS NOT NULL")
            .fetch_one(&pool)
            .await?;
    assert_eq!(deleted as u64, summary.events.soft_deleted);

    let notes_deleted: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM notes WHERE deleted_at IS NOT NULL")
            .fetch_one(&pool)
            .await?;
    assert_eq!(notes_deleted as u64, summary.notes.soft_deleted);

    Ok(())
}

#[tokio::test]
async fn restore_pass_is_bounded() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let corpus = write_corpus(dir.path());
    let options = small_options(&dir.path().join("out"), &corpus);
    let summary = run(&options).await?;

    for (restored, remaining, fraction, total) in [
        (summary.events.restored, summary.events.soft_deleted, 0.03_f64, 100.0_f64),
        (summary.notes.restored, summary.notes.soft_deleted, 0.04, 50.0),
    ] {
        let before = restored + remaining;
        if before > 0 {
            assert!(restored >= 1);
        }
        assert!(restored <= before);
        let wanted = (fraction * total).floor() as u64;
        assert!(restored <= wanted.max(1));
    }
    Ok(())
}

#[tokio::test]
async fn attachment_rows_point_at_copied_files() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let corpus = write_corpus(dir.path());
    let out = dir.path().join("out");
    let options = small_options(&out, &corpus);
    let summary = run(&options).await?;

    let pool = open_pool(&options.database_path()).await;
    let mut seen = 0;
    for table in [
        "bills",
        "policies",
        "property_documents",
        "inventory_items",
        "vehicle_maintenance",
        "pet_medical",
    ] {
        let rows = sqlx::query(&format!(
            "SELECT root_key, relative_path, document, category FROM {table}"
        ))
        .fetch_all(&pool)
        .await?;
        for row in rows {
            let root: String = row.try_get("root_key")?;
            let relative: String = row.try_get("relative_path")?;
            let document: String = row.try_get("document")?;
            let category: String = row.try_get("category")?;
            assert!(root == "attachments" || root == "appData");
            assert_eq!(relative, document);
            assert_eq!(category, table);
            assert!(relative.starts_with("hh_0"));
            assert!(out.join(&root).join(&relative).is_file(), "{root}/{relative}");
            seen += 1;
        }
    }
    assert_eq!(seen, 12);

    // hash placement with this corpus is seed independent
    assert_eq!(summary.attachments.attachments_root, 7);
    assert_eq!(summary.attachments.app_data_root, 5);
    assert_eq!(summary.attachments.small, 5);
    assert_eq!(summary.attachments.medium, 7);
    assert_eq!(summary.attachments.by_table.values().sum::<u64>(), 12);
    assert_eq!(summary.attachments.by_table.get("bills"), Some(&2));
    Ok(())
}

#[tokio::test]
async fn validated_run_clears_quality_gates() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let corpus = write_corpus(dir.path());
    let out = dir.path().join("out");
    let mut options = validated_options(&out, &corpus);
    let summary_path = dir.path().join("reports").join("summary.json");
    options.summary_path = Some(summary_path.clone());

    let summary = run(&options).await?;
    assert_eq!(summary.events.total, 2000);
    assert_eq!(summary.attachments.small, 33);
    assert_eq!(summary.attachments.medium, 27);
    assert_eq!(summary.attachments.app_data_root, 17);
    assert_eq!(summary.supporting.categories, 24);

    let written: SeedSummary = serde_json::from_str(&std::fs::read_to_string(&summary_path)?)?;
    assert_eq!(written, summary);

    let pool = open_pool(&options.database_path()).await;
    let mismatched_tz: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM notes n JOIN household h ON h.id = n.household_id \
         WHERE n.deadline IS NOT NULL AND n.deadline_tz IS NOT h.tz",
    )
    .fetch_one(&pool)
    .await?;
    assert_eq!(mismatched_tz, 0);

    let orphan_tz: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM notes WHERE deadline IS NULL AND deadline_tz IS NOT NULL",
    )
    .fetch_one(&pool)
    .await?;
    assert_eq!(orphan_tz, 0);

    let foreign_categories: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM notes n JOIN categories c ON c.id = n.category_id \
         WHERE c.household_id != n.household_id",
    )
    .fetch_one(&pool)
    .await?;
    assert_eq!(foreign_categories, 0);
    Ok(())
}

#[tokio::test]
async fn undersized_run_fails_validation_without_summary_file() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let corpus = write_corpus(dir.path());
    let mut options = small_options(&dir.path().join("out"), &corpus);
    options.skip_validation = false;
    options.events = 4;
    options.notes = 2;
    options.attachments = 1;
    let summary_path = dir.path().join("summary.json");
    options.summary_path = Some(summary_path.clone());

    let err = run(&options).await.unwrap_err();
    assert_eq!(err.code(), VALIDATION_CODE);
    let count: usize = err.context().get("violations").unwrap().parse()?;
    assert!(count >= 1, "{err}");
    assert!(err.context().contains_key("violation_01"));
    assert!(!summary_path.exists());
    Ok(())
}

#[tokio::test]
async fn second_run_requires_reset() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let corpus = write_corpus(dir.path());
    let mut options = small_options(&dir.path().join("out"), &corpus);
    options.events = 20;
    options.notes = 10;

    run(&options).await?;
    let err = run(&options).await.unwrap_err();
    assert_eq!(err.code(), CONFIG_CODE);

    options.reset = true;
    let summary = run(&options).await?;
    assert_eq!(summary.events.total, 20);
    assert!(summary.migrations_applied.len() >= 5);
    Ok(())
}

#[tokio::test]
async fn missing_corpus_fails_before_touching_disk() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let out = dir.path().join("out");
    let options = small_options(&out, &dir.path().join("nope"));

    let err = run(&options).await.unwrap_err();
    assert_eq!(err.code(), MISSING_INPUT_CODE);
    assert!(!out.exists());
    Ok(())
}

#[tokio::test]
async fn config_errors_fail_fast() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let corpus = write_corpus(dir.path());
    let out = dir.path().join("out");
    let mut options = small_options(&out, &corpus);
    options.households = 1;

    let err = run(&options).await.unwrap_err();
    assert_eq!(err.code(), CONFIG_CODE);
    assert!(!out.exists());
    Ok(())
}
