/// Environment variable holding the tracing filter for the seeder.
pub const LOG_ENV: &str = "ARKLOWDUN_SEED_LOG";
pub const DEFAULT_FILTER: &str = "arklowdun=info,sqlx=warn";

/// Install the JSON subscriber used by the seed binary.
///
/// Records go to stderr so stdout stays reserved for the summary document.
/// Calling this twice is harmless; the second install is ignored.
pub fn init() {
    let _ = tracing_log::LogTracer::init();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(std::env::var(LOG_ENV).unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .json()
        .with_target(true)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_writer(std::io::stderr)
        .try_init();
}
