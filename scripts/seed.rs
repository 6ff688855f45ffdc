use anyhow::{Context, Result};
use arklowdun_fixtures::{
    logging,
    migrate::MigrationSource,
    seed::{
        self, SeedOptions, DEFAULT_ATTACHMENTS, DEFAULT_EVENTS, DEFAULT_HOUSEHOLDS, DEFAULT_NOTES,
        DEFAULT_SEED,
    },
};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "seed", about = "Generate a deterministic large fixture corpus")]
struct Cli {
    /// Output directory for the database and attachment roots
    #[arg(long, value_name = "DIR")]
    out: Option<PathBuf>,

    /// Directory of sample attachment files
    #[arg(long, value_name = "DIR", default_value = "fixtures/large/attachments")]
    attachments: PathBuf,

    /// Directory of *.sql migrations (defaults to the embedded set)
    #[arg(long, value_name = "DIR")]
    migrations: Option<PathBuf>,

    #[arg(long, value_name = "U32", default_value_t = DEFAULT_SEED)]
    seed: u32,

    #[arg(long, value_name = "N", default_value_t = DEFAULT_HOUSEHOLDS)]
    households: u32,

    #[arg(long, value_name = "N", default_value_t = DEFAULT_EVENTS)]
    events: u32,

    #[arg(long, value_name = "N", default_value_t = DEFAULT_NOTES)]
    notes: u32,

    /// Number of attachment-backed rows
    #[arg(long = "attachments-count", value_name = "N", default_value_t = DEFAULT_ATTACHMENTS)]
    attachments_count: u32,

    /// Also write the JSON summary to this path
    #[arg(long, value_name = "PATH")]
    summary: Option<PathBuf>,

    /// Delete previous output before seeding
    #[arg(long)]
    reset: bool,

    /// Emit the summary even when quality gates fail
    #[arg(long)]
    skip_validation: bool,
}

fn default_out_dir() -> Result<PathBuf> {
    let base = dirs::data_dir().unwrap_or(std::env::current_dir()?);
    Ok(base
        .join("com.paula.arklowdun")
        .join("fixtures")
        .join("large"))
}

#[tokio::main]
async fn main() {
    logging::init();
    if let Err(err) = run(Cli::parse()).await {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let out = match cli.out {
        Some(out) => out,
        None => default_out_dir()?,
    };
    let mut options = SeedOptions::new(out, cli.attachments);
    options.migrations = cli
        .migrations
        .map(MigrationSource::Directory)
        .unwrap_or_default();
    options.seed = cli.seed;
    options.households = cli.households;
    options.events = cli.events;
    options.notes = cli.notes;
    options.attachments = cli.attachments_count;
    options.summary_path = cli.summary;
    options.reset = cli.reset;
    options.skip_validation = cli.skip_validation;

    let summary = seed::run(&options).await?;
    println!(
        "{}",
        summary.to_pretty_json().context("serialize seed summary")?
    );
    Ok(())
}
